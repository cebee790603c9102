//! XPath 1.0 Functions
//!
//! Implements all 27+ XPath 1.0 core functions:
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()

use super::value::{parse_number, XPathValue};
use crate::dom::{self, DocumentAccess, NodeId};

/// Evaluate a function call
pub fn call<D: DocumentAccess>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
    position: usize,
    size: usize,
) -> Result<XPathValue, String> {
    match name {
        // Node Set Functions
        "position" => Ok(XPathValue::Number(position as f64)),
        "last" => Ok(XPathValue::Number(size as f64)),
        "count" => fn_count(args),
        "local-name" => fn_node_name(NamePart::Local, name, args, doc, context),
        "namespace-uri" => fn_node_name(NamePart::Namespace, name, args, doc, context),
        "name" => fn_node_name(NamePart::Qualified, name, args, doc, context),
        "id" => fn_id(args),

        // String Functions
        "string" => fn_string(args, doc, context),
        "concat" => fn_concat(args, doc),
        "starts-with" => fn_starts_with(args, doc),
        "contains" => fn_contains(args, doc),
        "substring" => fn_substring(args, doc),
        "substring-before" => fn_substring_before(args, doc),
        "substring-after" => fn_substring_after(args, doc),
        "string-length" => fn_string_length(args, doc, context),
        "normalize-space" => fn_normalize_space(args, doc, context),
        "translate" => fn_translate(args, doc),

        // Boolean Functions
        "boolean" => fn_boolean(args),
        "not" => fn_not(args),
        "true" => Ok(XPathValue::Boolean(true)),
        "false" => Ok(XPathValue::Boolean(false)),
        "lang" => fn_lang(args, doc, context),

        // Number Functions
        "number" => fn_number(args, doc, context),
        "sum" => fn_sum(args, doc),
        "floor" => fn_floor(args, doc),
        "ceiling" => fn_ceiling(args, doc),
        "round" => fn_round(args, doc),

        _ => Err(format!("Unknown function: {}", name)),
    }
}

// Node Set Functions

fn fn_count(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("count() requires exactly 1 argument".to_string());
    }
    match &args[0] {
        XPathValue::NodeSet(nodes) => Ok(XPathValue::Number(nodes.len() as f64)),
        XPathValue::StringList(values) => Ok(XPathValue::Number(values.len() as f64)),
        _ => Err("count() argument must be a node-set".to_string()),
    }
}

/// Which name of a node a name function reports
#[derive(Clone, Copy)]
enum NamePart {
    Local,
    Namespace,
    Qualified,
}

/// local-name(), namespace-uri() and name(): the first node of the
/// argument, or the context node when called without one
fn fn_node_name<D: DocumentAccess>(
    part: NamePart,
    fn_name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<XPathValue, String> {
    let node = match args.first() {
        None => context,
        Some(XPathValue::NodeSet(nodes)) => match nodes.first() {
            Some(&first) => first,
            None => return Ok(XPathValue::String(String::new())),
        },
        Some(_) => return Err(format!("{}() argument must be a node-set", fn_name)),
    };
    if args.len() > 1 {
        return Err(format!("{}() takes at most 1 argument", fn_name));
    }

    let value = match part {
        NamePart::Local => doc.node_local_name(node),
        NamePart::Namespace => doc.node_namespace_uri(node),
        NamePart::Qualified => doc.node_name(node),
    };
    Ok(XPathValue::String(value.unwrap_or_default().to_string()))
}

fn fn_id(_args: Vec<XPathValue>) -> Result<XPathValue, String> {
    Err("id() is not supported: attribute types from a DTD are not tracked".to_string())
}

// String Functions

fn fn_string<D: DocumentAccess>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<XPathValue, String> {
    let value = if args.is_empty() {
        dom::node_string_value(doc, context)
    } else {
        resolve_string(&args[0], doc)
    };
    Ok(XPathValue::String(value))
}

fn fn_concat<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, String> {
    if args.len() < 2 {
        return Err("concat() requires at least 2 arguments".to_string());
    }
    let result: String = args.iter().map(|a| resolve_string(a, doc)).collect();
    Ok(XPathValue::String(result))
}

fn fn_starts_with<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, String> {
    if args.len() != 2 {
        return Err("starts-with() requires exactly 2 arguments".to_string());
    }
    let s = resolve_string(&args[0], doc);
    let prefix = resolve_string(&args[1], doc);
    Ok(XPathValue::Boolean(s.starts_with(&prefix)))
}

fn fn_contains<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, String> {
    if args.len() != 2 {
        return Err("contains() requires exactly 2 arguments".to_string());
    }
    let s = resolve_string(&args[0], doc);
    let pattern = resolve_string(&args[1], doc);
    Ok(XPathValue::Boolean(s.contains(&pattern)))
}

fn fn_substring<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, String> {
    if args.len() < 2 || args.len() > 3 {
        return Err("substring() requires 2 or 3 arguments".to_string());
    }

    // Characters at 1-based positions p with start <= p < start + len are kept
    let s = resolve_string(&args[0], doc);
    let start = round_half_up(args[1].number_in(doc));
    let end = match args.get(2) {
        Some(len) => start + round_half_up(len.number_in(doc)),
        None => f64::INFINITY,
    };

    let result: String = s
        .chars()
        .enumerate()
        .filter(|&(i, _)| {
            let p = (i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect();

    Ok(XPathValue::String(result))
}

fn fn_substring_before<D: DocumentAccess>(
    args: Vec<XPathValue>,
    doc: &D,
) -> Result<XPathValue, String> {
    if args.len() != 2 {
        return Err("substring-before() requires exactly 2 arguments".to_string());
    }
    let s = resolve_string(&args[0], doc);
    let pattern = resolve_string(&args[1], doc);

    let result = if let Some(pos) = s.find(&pattern) {
        s[..pos].to_string()
    } else {
        String::new()
    };

    Ok(XPathValue::String(result))
}

fn fn_substring_after<D: DocumentAccess>(
    args: Vec<XPathValue>,
    doc: &D,
) -> Result<XPathValue, String> {
    if args.len() != 2 {
        return Err("substring-after() requires exactly 2 arguments".to_string());
    }
    let s = resolve_string(&args[0], doc);
    let pattern = resolve_string(&args[1], doc);

    let result = if let Some(pos) = s.find(&pattern) {
        s[pos + pattern.len()..].to_string()
    } else {
        String::new()
    };

    Ok(XPathValue::String(result))
}

fn fn_string_length<D: DocumentAccess>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<XPathValue, String> {
    if args.len() > 1 {
        return Err("string-length() requires 0 or 1 arguments".to_string());
    }
    let s = if args.is_empty() {
        dom::node_string_value(doc, context)
    } else {
        resolve_string(&args[0], doc)
    };
    Ok(XPathValue::Number(s.chars().count() as f64))
}

fn fn_normalize_space<D: DocumentAccess>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<XPathValue, String> {
    let s = if args.is_empty() {
        dom::node_string_value(doc, context)
    } else if args.len() == 1 {
        resolve_string(&args[0], doc)
    } else {
        return Err("normalize-space() requires 0 or 1 arguments".to_string());
    };

    let normalized: String = s.split_whitespace().collect::<Vec<_>>().join(" ");

    Ok(XPathValue::String(normalized))
}

fn fn_translate<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, String> {
    if args.len() != 3 {
        return Err("translate() requires exactly 3 arguments".to_string());
    }

    let s = resolve_string(&args[0], doc);
    let from: Vec<char> = resolve_string(&args[1], doc).chars().collect();
    let to: Vec<char> = resolve_string(&args[2], doc).chars().collect();

    let result: String = s
        .chars()
        .filter_map(|c| {
            if let Some(pos) = from.iter().position(|&fc| fc == c) {
                to.get(pos).copied()
            } else {
                Some(c)
            }
        })
        .collect();

    Ok(XPathValue::String(result))
}

// Boolean Functions

fn fn_boolean(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("boolean() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Boolean(args[0].to_boolean()))
}

fn fn_not(args: Vec<XPathValue>) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("not() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Boolean(!args[0].to_boolean()))
}

fn fn_lang<D: DocumentAccess>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("lang() requires exactly 1 argument".to_string());
    }
    let target_lang = args[0].string_in(doc).to_lowercase();

    // Walk up ancestor chain looking for xml:lang attribute
    let mut node = context;
    loop {
        if let Some(lang_val) = doc.get_attribute(node, "xml:lang") {
            let lang_lower = lang_val.to_lowercase();
            // Exact match or subtag prefix match (e.g., "en" matches "en-US")
            if lang_lower == target_lang
                || (lang_lower.starts_with(&target_lang)
                    && lang_lower.as_bytes().get(target_lang.len()) == Some(&b'-'))
            {
                return Ok(XPathValue::Boolean(true));
            }
            return Ok(XPathValue::Boolean(false));
        }
        match doc.parent_of(node) {
            Some(parent) => node = parent,
            None => break,
        }
    }
    Ok(XPathValue::Boolean(false))
}

// Number Functions

fn fn_number<D: DocumentAccess>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<XPathValue, String> {
    let value = if args.is_empty() {
        parse_number(&dom::node_string_value(doc, context))
    } else if args.len() == 1 {
        args[0].number_in(doc)
    } else {
        return Err("number() requires 0 or 1 arguments".to_string());
    };
    Ok(XPathValue::Number(value))
}

fn fn_sum<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("sum() requires exactly 1 argument".to_string());
    }

    match args[0].member_strings(doc) {
        Some(members) => Ok(XPathValue::Number(members.iter().map(|m| parse_number(m)).sum())),
        None => Err("sum() argument must be a node-set".to_string()),
    }
}

fn fn_floor<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("floor() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Number(args[0].number_in(doc).floor()))
}

fn fn_ceiling<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("ceiling() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Number(args[0].number_in(doc).ceil()))
}

fn fn_round<D: DocumentAccess>(args: Vec<XPathValue>, doc: &D) -> Result<XPathValue, String> {
    if args.len() != 1 {
        return Err("round() requires exactly 1 argument".to_string());
    }
    Ok(XPathValue::Number(round_half_up(args[0].number_in(doc))))
}

/// XPath round: halves round towards positive infinity
fn round_half_up(n: f64) -> f64 {
    if n.fract() == 0.5 || n.fract() == -0.5 {
        n.ceil()
    } else {
        n.round()
    }
}

/// string() of an argument, reading node string-values from the document
fn resolve_string<D: DocumentAccess>(val: &XPathValue, doc: &D) -> String {
    val.string_in(doc)
}
