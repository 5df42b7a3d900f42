//! Per compilation unit driver.
//!
//! A [`Session`] owns the device registry and the configuration shared by all
//! loop directives of one compilation unit. Directives are lowered
//! independently: a malformed or conflicting clause list only discards the
//! directive it belongs to, while an internal consistency violation aborts the
//! whole unit.
use std::sync::Arc;

use log::{debug, info, warn};

use crate::{
    clause::{ClauseRecord, Pragma},
    config::LoweringConfig,
    device::DeviceRegistry,
    grammar::ClauseGrammar,
    ir::{LoopOp, operand::Location},
    lower::{LoopSkeleton, lower_loop},
    resolve::resolve,
    utils::{Error, Result},
};

/// One `#pragma acc loop` and the `for` statement it annotates.
#[derive(Debug, Clone)]
pub struct Directive {
    pub records: Vec<ClauseRecord>,
    pub skeleton: LoopSkeleton,
    /// Location of the directive itself.
    pub loc: Location,
}

/// A directive that could not be lowered.
#[derive(Debug)]
pub struct Diagnostic {
    pub location: Location,
    pub error: Error,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}: {}", self.location, self.error)
    }
}

/// Outcome of every directive of a unit, in input order.
#[derive(Debug, Default)]
pub struct UnitReport {
    pub outcomes: Vec<std::result::Result<LoopOp, Diagnostic>>,
}

impl UnitReport {
    pub fn lowered(&self) -> impl Iterator<Item = &LoopOp> + '_ {
        self.outcomes.iter().filter_map(|outcome| outcome.as_ref().ok())
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.outcomes.iter().filter_map(|outcome| outcome.as_ref().err())
    }
}

pub struct Session {
    devices: Arc<DeviceRegistry>,
    config: LoweringConfig,
    grammar: Box<dyn ClauseGrammar + Send + Sync>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("devices", &self.devices)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session with the default configuration and a fresh registry.
    pub fn new() -> Self {
        Self::with_config(LoweringConfig::default(), Arc::new(DeviceRegistry::new()))
    }

    pub fn with_config(config: LoweringConfig, devices: Arc<DeviceRegistry>) -> Self {
        let grammar = config.grammar();
        Self {
            devices,
            config,
            grammar,
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.devices
    }

    /// Validate, check, resolve and lower a single directive.
    pub fn lower_directive(&self, directive: Directive) -> Result<LoopOp> {
        let Directive {
            records,
            skeleton,
            loc,
        } = directive;

        let pragma = Pragma::from_records(&records, &self.devices, self.config.clause_options())?;
        self.grammar.check(&pragma, &self.devices)?;

        let attributes = resolve(&pragma);
        let op = lower_loop(skeleton, attributes, loc);
        op.verify()?;
        Ok(op)
    }

    /// Lower every directive of a compilation unit.
    ///
    /// Clause errors are recorded in the returned [`UnitReport`] and lowering
    /// continues with the next directive. The first fatal error is returned
    /// as is.
    pub fn lower_unit(
        &self,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Result<UnitReport> {
        let mut report = UnitReport::default();

        for directive in directives {
            let location = directive.loc.clone();
            match self.lower_directive(directive) {
                Ok(op) => {
                    debug!("Lowered `acc.loop` at {:#}.", location);
                    report.outcomes.push(Ok(op));
                }
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    warn!("Discarding loop directive at {:#}: {}", location, error);
                    report.outcomes.push(Err(Diagnostic { location, error }));
                }
            }
        }

        info!(
            "Lowered {} of {} loop directive(s).",
            report.lowered().count(),
            report.outcomes.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clause::ModifierKind,
        ir::{GenericOp, Operation, operand::Value},
    };

    fn cond_const() -> Operation {
        GenericOp::new("cir.const", [])
            .with_result(Value(0))
            .with_type("!cir.bool")
            .into()
    }

    fn skeleton() -> LoopSkeleton {
        LoopSkeleton::builder(Location::Unknown)
            .cond([cond_const()], Value(0))
            .body([])
            .step([])
            .build()
            .unwrap()
    }

    fn directive(records: Vec<ClauseRecord>, line: u32) -> Directive {
        Directive {
            records,
            skeleton: skeleton(),
            loc: Location::new("unit.cpp", line, 9),
        }
    }

    #[test]
    fn session_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
    }

    #[test]
    fn failing_directive_does_not_affect_neighbours() {
        let session = Session::new();
        let report = session
            .lower_unit([
                directive(vec![ClauseRecord::modifier("seq")], 1),
                directive(vec![ClauseRecord::modifier("gang")], 2),
                directive(
                    vec![
                        ClauseRecord::selector("device_type", ["nvidia"]),
                        ClauseRecord::modifier("auto"),
                    ],
                    3,
                ),
            ])
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.lowered().count(), 2);
        let diagnostics: Vec<_> = report.diagnostics().collect();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].error.is_malformed_clause());
        assert!(diagnostics[0].to_string().starts_with("unit.cpp:2:9: "));

        let third = report.outcomes[2].as_ref().unwrap();
        let nvidia = session.registry().lookup("nvidia").unwrap();
        assert_eq!(third.attributes.get(ModifierKind::Auto), Some(&[nvidia][..]));
    }

    #[test]
    fn conflicts_follow_configuration() {
        let records = vec![ClauseRecord::modifier("seq"), ClauseRecord::modifier("independent")];

        let strict = Session::new();
        let err = strict.lower_directive(directive(records.clone(), 1)).unwrap_err();
        assert!(err.is_conflicting_modifiers());

        let config = LoweringConfig {
            enforce_exclusivity: false,
            ..Default::default()
        };
        let permissive = Session::with_config(config, Arc::new(DeviceRegistry::new()));
        let op = permissive.lower_directive(directive(records, 1)).unwrap();
        assert_eq!(op.attributes.len(), 2);
    }

    #[test]
    fn inconsistent_skeleton_aborts_the_unit() {
        let broken = LoopSkeleton::builder(Location::Unknown)
            .init([GenericOp::new("cir.alloca", []).with_result(Value(0)).into()])
            .cond([cond_const()], Value(0))
            .body([])
            .step([])
            .build()
            .unwrap();

        let session = Session::new();
        let err = session
            .lower_unit([
                directive(vec![ClauseRecord::modifier("gang")], 1),
                Directive {
                    records: vec![ClauseRecord::modifier("seq")],
                    skeleton: broken,
                    loc: Location::new("unit.cpp", 2, 9),
                },
                directive(vec![ClauseRecord::modifier("seq")], 3),
            ])
            .unwrap_err();
        assert!(err.is_internal_consistency());
        assert!(err.is_fatal());
    }

    #[test]
    fn dtype_alias_can_be_disabled() {
        let config = LoweringConfig {
            accept_dtype_alias: false,
            ..Default::default()
        };
        let session = Session::with_config(config, Arc::new(DeviceRegistry::new()));
        let err = session
            .lower_directive(directive(vec![ClauseRecord::selector("dtype", ["nvidia"])], 1))
            .unwrap_err();
        assert!(err.is_malformed_clause());
    }
}
