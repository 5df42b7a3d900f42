//! Textual readers
//!
//! Two small chumsky parsers:
//!
//! - [`parse_clauses`] reads the clause list of a loop directive
//!   (`#pragma acc loop device_type(nvidia, radeon) seq`) into the
//!   [`ClauseRecord`]s the directive parser would hand over;
//! - [`parse_attributes`] reads an attribute dictionary as printed on an
//!   `acc.loop` (`{seq = [#acc.device_type<none>]}`) back into an
//!   [`AttributeMap`].
use chumsky::prelude::*;

use crate::{
    clause::{ClauseRecord, ModifierKind, RecordKind},
    device::{DeviceRegistry, DeviceTag},
    resolve::AttributeMap,
    utils::{Error, ParserError, Result},
};

type Extra<'src> = extra::Err<Rich<'src, char>>;

impl ParserError {
    fn from_rich(error: &Rich<'_, char>, file: Option<&str>) -> Self {
        let span = error.span();
        Self {
            message: error.to_string(),
            start: span.start,
            end: span.end,
            file: file.map(str::to_string),
        }
    }
}

fn collect_errors(errors: Vec<Rich<'_, char>>, file: Option<&str>) -> Error {
    Error::ParserErrors {
        errors: errors
            .iter()
            .map(|error| ParserError::from_rich(error, file))
            .collect(),
    }
}

/// Optional `#pragma acc loop` prefix. `acc` and `loop` must be whole words.
pub fn directive_prefix_parser<'src>() -> impl Parser<'src, &'src str, (), Extra<'src>> + Clone {
    just("#pragma")
        .then(text::whitespace().at_least(1))
        .then(text::keyword("acc"))
        .then(text::whitespace().at_least(1))
        .then(text::keyword("loop"))
        .ignored()
        .labelled("directive prefix")
}

/// A device name inside `device_type(..)`: an identifier or `*`.
pub fn device_name_parser<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    choice((
        just(DeviceTag::STAR_CLAUSE).to(DeviceTag::STAR_CLAUSE.to_string()),
        text::ident().map(|name: &str| name.to_string()),
    ))
    .labelled("device type")
}

/// One clause: `keyword` or `keyword(name, ..)`.
pub fn clause_parser<'src>() -> impl Parser<'src, &'src str, ClauseRecord, Extra<'src>> + Clone {
    let names = device_name_parser()
        .padded()
        .separated_by(just(','))
        .collect::<Vec<_>>()
        .padded()
        .delimited_by(just('('), just(')'))
        .labelled("device type list");

    text::ident()
        .map(|keyword: &str| keyword.to_string())
        .then(text::whitespace().ignore_then(names).or_not())
        .map_with(|(keyword, names), extra| {
            let span: SimpleSpan = extra.span();
            let kind = match names {
                Some(names) => RecordKind::Selector { keyword, names },
                None => RecordKind::Modifier { keyword },
            };
            ClauseRecord {
                kind,
                span: span.start..span.end,
            }
        })
        .labelled("clause")
}

/// A whole clause list, optionally preceded by the directive prefix. Clauses
/// are separated by whitespace and/or commas.
pub fn clause_list_parser<'src>()
-> impl Parser<'src, &'src str, Vec<ClauseRecord>, Extra<'src>> + Clone {
    directive_prefix_parser()
        .padded()
        .or_not()
        .ignore_then(
            clause_parser()
                .then_ignore(just(',').padded().or_not())
                .padded()
                .repeated()
                .collect::<Vec<_>>(),
        )
        .padded()
}

/// Parse the clause list of a loop directive.
///
/// ```rust
/// # use hyacc::{clause::RecordKind, parser::parse_clauses};
/// let records = parse_clauses("#pragma acc loop device_type(nvidia, radeon) seq", None).unwrap();
/// assert_eq!(records.len(), 2);
/// assert!(matches!(&records[1].kind, RecordKind::Modifier { keyword } if keyword == "seq"));
/// ```
pub fn parse_clauses(src: &str, file: Option<&str>) -> Result<Vec<ClauseRecord>> {
    let (records, errors) = clause_list_parser()
        .then_ignore(end())
        .parse(src)
        .into_output_errors();

    if !errors.is_empty() {
        return Err(collect_errors(errors, file));
    }

    records.ok_or_else(|| Error::ParserErrors { errors: vec![] })
}

/// The spelling between `<` and `>` of a `#acc.device_type<..>` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TagSpelling {
    None,
    Star,
    Named(String),
}

fn quoted_string_parser<'src>() -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let escaped = just('\\').ignore_then(one_of("\\\""));
    choice((escaped, none_of("\\\"")))
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'))
        .labelled("quoted device type")
}

fn device_tag_parser<'src>() -> impl Parser<'src, &'src str, TagSpelling, Extra<'src>> + Clone {
    let spelling = choice((
        quoted_string_parser().map(TagSpelling::Named),
        text::ident().map(|name: &str| match name {
            DeviceTag::NONE_KEYWORD => TagSpelling::None,
            DeviceTag::STAR_KEYWORD => TagSpelling::Star,
            other => TagSpelling::Named(other.to_string()),
        }),
    ));

    just("#acc.device_type")
        .ignore_then(spelling.padded().delimited_by(just('<'), just('>')))
        .labelled("device type attribute")
}

fn attribute_entry_parser<'src>(
    registry: &'src DeviceRegistry,
) -> impl Parser<'src, &'src str, (ModifierKind, Vec<DeviceTag>), Extra<'src>> + Clone {
    let name = text::ident().try_map(|name: &str, span| {
        ModifierKind::from_attr_name(name)
            .ok_or_else(|| Rich::custom(span, format!("unknown loop attribute `{}`", name)))
    });

    let tags = device_tag_parser()
        .map(move |spelling| match spelling {
            TagSpelling::None => DeviceTag::None,
            TagSpelling::Star => DeviceTag::Star,
            TagSpelling::Named(name) => DeviceTag::Named(registry.search_or_insert(&name)),
        })
        .padded()
        .separated_by(just(','))
        .collect::<Vec<_>>()
        .padded()
        .delimited_by(just('['), just(']'));

    name.padded()
        .then_ignore(just('='))
        .then(tags.padded())
        .labelled("attribute")
}

/// An attribute dictionary, optionally preceded by the `attributes` keyword.
pub fn attributes_parser<'src>(
    registry: &'src DeviceRegistry,
) -> impl Parser<'src, &'src str, AttributeMap, Extra<'src>> + Clone {
    just("attributes")
        .padded()
        .or_not()
        .ignore_then(
            attribute_entry_parser(registry)
                .separated_by(just(','))
                .collect::<Vec<_>>()
                .padded()
                .delimited_by(just('{'), just('}')),
        )
        .try_map(|entries, span| {
            AttributeMap::try_from_entries(entries)
                .map_err(|err| Rich::custom(span, err.to_string()))
        })
        .padded()
}

/// Parse an attribute dictionary printed by [`AttributeMap::fmt`].
///
/// Named device types are interned into `registry`. The unscoped tag
/// (`none`) and a device literally called `"none"` read back as different
/// tags.
///
/// ```rust
/// # use hyacc::{clause::ModifierKind, parser::parse_attributes};
/// # use hyacc::device::{DeviceRegistry, DeviceTag};
/// let reg = DeviceRegistry::new();
/// let attrs = parse_attributes(
///     &reg,
///     r#"{seq = [#acc.device_type<none>, #acc.device_type<"none">]}"#,
///     None,
/// ).unwrap();
/// let seq = attrs.get(ModifierKind::Seq).unwrap();
/// assert_eq!(seq[0], DeviceTag::None);
/// assert!(seq[1].is_named());
/// ```
pub fn parse_attributes(
    registry: &DeviceRegistry,
    src: &str,
    file: Option<&str>,
) -> Result<AttributeMap> {
    let (attributes, errors) = attributes_parser(registry)
        .then_ignore(end())
        .parse(src)
        .into_output_errors();

    if !errors.is_empty() {
        return Err(collect_errors(errors, file));
    }

    attributes.ok_or_else(|| Error::ParserErrors { errors: vec![] })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(records: &[ClauseRecord]) -> Vec<&str> {
        records.iter().map(|record| record.keyword()).collect()
    }

    #[test]
    fn clause_lists_with_and_without_prefix() {
        let records = parse_clauses("seq device_type(nvidia, radeon)", None).unwrap();
        assert_eq!(keywords(&records), vec!["seq", "device_type"]);
        assert_eq!(
            records[1].kind,
            RecordKind::Selector {
                keyword: "device_type".to_string(),
                names: vec!["nvidia".to_string(), "radeon".to_string()],
            }
        );
        assert_eq!(records[0].span, 0..3);

        let records = parse_clauses("  #pragma acc loop dtype(*), auto  ", None).unwrap();
        assert_eq!(keywords(&records), vec!["dtype", "auto"]);
        assert!(matches!(&records[0].kind, RecordKind::Selector { names, .. } if names == &["*"]));

        assert!(parse_clauses("#pragma acc loop", None).unwrap().is_empty());
    }

    #[test]
    fn prefix_words_must_be_separated() {
        for src in ["#pragma acc loopseq", "#pragma accloop seq", "#pragma acc loop_x seq"] {
            let err = parse_clauses(src, None).unwrap_err();
            assert!(err.is_parser_errors(), "`{src}` should not parse: {err:?}");
        }

        let records = parse_clauses("#pragma acc loop\tseq", None).unwrap();
        assert_eq!(keywords(&records), vec!["seq"]);
    }

    #[test]
    fn empty_device_list_reaches_clause_validation() {
        let records = parse_clauses("device_type( ) seq", None).unwrap();
        assert!(matches!(&records[0].kind, RecordKind::Selector { names, .. } if names.is_empty()));
    }

    #[test]
    fn syntax_errors_carry_spans() {
        let err = parse_clauses("device_type(nvidia seq", Some("loop.cpp")).unwrap_err();
        match err {
            Error::ParserErrors { errors } => {
                assert!(!errors.is_empty());
                assert_eq!(errors[0].file.as_deref(), Some("loop.cpp"));
                assert!(errors[0].start <= errors[0].end);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn attribute_dictionaries() {
        let reg = DeviceRegistry::new();
        let src = concat!(
            "attributes {auto_ = [#acc.device_type<nvidia>, #acc.device_type<star>], ",
            "seq = [#acc.device_type<none>]}",
        );
        let attrs = parse_attributes(&reg, src, None).unwrap();
        let nvidia = reg.lookup("nvidia").unwrap();
        assert_eq!(attrs.get(ModifierKind::Auto), Some(&[nvidia, DeviceTag::Star][..]));
        assert_eq!(attrs.get(ModifierKind::Seq), Some(&[DeviceTag::None][..]));
        assert_eq!(attrs.get(ModifierKind::Independent), None);

        assert!(parse_attributes(&reg, "{}", None).unwrap().is_empty());
        assert!(parse_attributes(&reg, "{auto = [#acc.device_type<none>]}", None).is_err());
        assert!(parse_attributes(&reg, "{seq = []}", None).is_err());
    }
}
