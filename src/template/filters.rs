//! Built-in filters.

use super::engine::FilterFn;
use super::{RenderContext, RenderError, Value};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

type FilterResult = Result<Value, RenderError>;

pub(crate) fn builtin() -> Vec<(&'static str, Arc<FilterFn>)> {
    let filters: [(&'static str, Arc<FilterFn>); 15] = [
        ("where", Arc::new(where_eq)),
        ("strip", Arc::new(strip)),
        ("lstrip", Arc::new(lstrip)),
        ("rstrip", Arc::new(rstrip)),
        ("nonempty", Arc::new(nonempty)),
        ("reverse", Arc::new(reverse)),
        ("slice", Arc::new(slice)),
        ("resolve", Arc::new(resolve)),
        ("json", Arc::new(json)),
        ("base64", Arc::new(base64)),
        ("size", Arc::new(size)),
        ("upcase", Arc::new(upcase)),
        ("downcase", Arc::new(downcase)),
        ("default", Arc::new(default)),
        ("join", Arc::new(join)),
    ];
    filters.into()
}

fn arg<'a>(args: &'a [Value], i: usize) -> &'a Value {
    static NIL: Value = Value::Nil;
    args.get(i).unwrap_or(&NIL)
}

/// Items whose `key` equals `target`; lookups on site objects are traced.
fn where_eq(ctx: &mut RenderContext<'_>, input: Value, args: &[Value]) -> FilterResult {
    let Value::List(items) = input else {
        return Ok(Value::List(Vec::new()));
    };
    let key = arg(args, 0).render();
    let target = arg(args, 1);

    let mut result = Vec::new();
    for item in items {
        if item.get_path(&key, ctx)?.loose_eq(target) {
            result.push(item);
        }
    }
    Ok(Value::List(result))
}

fn map_str(input: Value, f: impl FnOnce(&str) -> &str) -> Value {
    match input {
        Value::Str(s) => Value::from(f(&s)),
        other => other,
    }
}

fn strip(_: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(map_str(input, str::trim))
}

fn lstrip(_: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(map_str(input, str::trim_start))
}

fn rstrip(_: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(map_str(input, str::trim_end))
}

fn nonempty(_: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(Value::Bool(match &input {
        Value::List(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
        Value::Str(s) => !s.is_empty(),
        _ => false,
    }))
}

fn reverse(_: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(match input {
        Value::List(mut items) => {
            items.reverse();
            Value::List(items)
        }
        Value::Str(s) => Value::Str(s.chars().rev().collect()),
        other => other,
    })
}

/// Resolve a possibly negative slice bound against `len`.
fn bound(value: &Value, len: usize, default: usize) -> usize {
    let Some(i) = value.as_int() else {
        return default;
    };
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let i = if i < 0 { (len_i + i).max(0) } else { i.min(len_i) };
    usize::try_from(i).unwrap_or(0)
}

/// `slice: start[, end]` with negative indices counted from the end.
fn slice(_: &mut RenderContext<'_>, input: Value, args: &[Value]) -> FilterResult {
    Ok(match input {
        Value::List(items) => {
            let start = bound(arg(args, 0), items.len(), 0);
            let end = bound(arg(args, 1), items.len(), items.len());
            Value::List(items.get(start..end.max(start)).unwrap_or_default().to_vec())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let start = bound(arg(args, 0), chars.len(), 0);
            let end = bound(arg(args, 1), chars.len(), chars.len());
            Value::Str(chars[start..end.max(start)].iter().collect())
        }
        other => other,
    })
}

/// Resolve `input` against a reference path; a reference with an extension
/// resolves relative to its directory.
fn resolve(_: &mut RenderContext<'_>, input: Value, args: &[Value]) -> FilterResult {
    let path = input.render();
    let reference = arg(args, 0).render();
    let reference = Path::new(&reference);
    let base = if reference.extension().is_some() {
        reference.parent().unwrap_or(Path::new(""))
    } else {
        reference
    };
    Ok(Value::Str(normalize(&Path::new("/").join(base).join(path))))
}

/// Lexically normalize an absolute path.
fn normalize(path: &Path) -> String {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out.to_string_lossy().replace('\\', "/")
}

fn json(_: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(Value::Str(input.to_json().to_string()))
}

fn base64(_: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(Value::Str(STANDARD.encode(input.render())))
}

fn size(ctx: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(match input {
        Value::List(_) | Value::Map(_) | Value::Str(_) | Value::Object(_) => {
            match input.get_key("size", ctx)? {
                Value::Nil => Value::Int(0),
                size => size,
            }
        }
        _ => Value::Int(0),
    })
}

fn upcase(_: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(Value::Str(input.render().to_uppercase()))
}

fn downcase(_: &mut RenderContext<'_>, input: Value, _: &[Value]) -> FilterResult {
    Ok(Value::Str(input.render().to_lowercase()))
}

fn default(_: &mut RenderContext<'_>, input: Value, args: &[Value]) -> FilterResult {
    Ok(if input.is_truthy() {
        input
    } else {
        arg(args, 0).clone()
    })
}

fn join(_: &mut RenderContext<'_>, input: Value, args: &[Value]) -> FilterResult {
    let Value::List(items) = input else {
        return Ok(input);
    };
    let sep = match arg(args, 0) {
        Value::Nil => " ".to_owned(),
        sep => sep.render(),
    };
    Ok(Value::Str(
        items.iter().map(Value::render).collect::<Vec<_>>().join(&sep),
    ))
}
