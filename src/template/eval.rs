//! Node tree evaluation.

use super::context::Scope;
use super::engine::TagCall;
use super::markup::{Markup, Param};
use super::parser::{Condition, Expr, FilterCall, Node};
use super::{RenderContext, RenderError, Value};
use crate::log;
use std::collections::BTreeMap;

pub(crate) fn render_nodes(
    nodes: &[Node],
    ctx: &mut RenderContext<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output { expr, filters } => {
                let value = eval_output(expr, filters, ctx)?;
                out.push_str(&value.render());
            }
            Node::If {
                cond,
                then,
                otherwise,
            } => {
                let branch = if eval_condition(cond, ctx)? { then } else { otherwise };
                render_nodes(branch, ctx, out)?;
            }
            Node::For { var, iter, body } => render_for(var, iter, body, ctx, out)?,
            Node::Include { file, params } => render_include(file, params, ctx, out)?,
            Node::Log(names) => render_log(names, ctx)?,
            Node::Tag {
                name,
                markup,
                parsed,
            } => {
                let tag = ctx.env.engine.tag(name)?;
                let call = TagCall {
                    markup: markup.clone(),
                    params: resolve_params(parsed, ctx)?,
                };
                out.push_str(&tag(ctx, &call)?);
            }
        }
    }
    Ok(())
}

fn eval_expr(expr: &Expr, ctx: &mut RenderContext<'_>) -> Result<Value, RenderError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(path) => ctx.get(path),
    }
}

fn eval_output(
    expr: &Expr,
    filters: &[FilterCall],
    ctx: &mut RenderContext<'_>,
) -> Result<Value, RenderError> {
    let mut value = eval_expr(expr, ctx)?;
    for call in filters {
        let filter = ctx.env.engine.filter(&call.name)?;
        let args = call
            .args
            .iter()
            .map(|arg| eval_expr(arg, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        value = filter(ctx, value, &args)?;
    }
    Ok(value)
}

fn eval_condition(cond: &Condition, ctx: &mut RenderContext<'_>) -> Result<bool, RenderError> {
    let left = eval_expr(&cond.left, ctx)?;
    Ok(match &cond.compare {
        None => left.is_truthy(),
        Some((negated, right)) => left.loose_eq(&eval_expr(right, ctx)?) != *negated,
    })
}

fn render_for(
    var: &str,
    iter: &Expr,
    body: &[Node],
    ctx: &mut RenderContext<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    let items = match eval_expr(iter, ctx)? {
        Value::List(items) => items,
        Value::Map(map) => map
            .into_iter()
            .map(|(k, v)| Value::List(vec![Value::Str(k), v]))
            .collect(),
        _ => return Ok(()),
    };

    let length = items.len();
    for (i, item) in items.into_iter().enumerate() {
        let index0 = i64::try_from(i).unwrap_or(i64::MAX);
        let forloop = BTreeMap::from([
            ("index".to_owned(), Value::Int(index0 + 1)),
            ("index0".to_owned(), Value::Int(index0)),
            ("first".to_owned(), Value::Bool(i == 0)),
            ("last".to_owned(), Value::Bool(i + 1 == length)),
            ("length".to_owned(), Value::Int(i64::try_from(length).unwrap_or(i64::MAX))),
        ]);
        ctx.push_scope(Scope::from([
            (var.to_owned(), item),
            ("forloop".to_owned(), Value::Map(forloop)),
        ]));
        let result = render_nodes(body, ctx, out);
        ctx.pop_scope();
        result?;
    }
    Ok(())
}

fn resolve_params(
    markup: &Markup,
    ctx: &mut RenderContext<'_>,
) -> Result<Vec<(String, Value)>, RenderError> {
    markup
        .params
        .iter()
        .map(|(name, param)| {
            let value = match param {
                Param::Literal(s) => Value::Str(s.clone()),
                Param::Number(n) => Value::Int(*n),
                Param::Variable(path) => ctx.get(path)?,
                Param::Flag => Value::Bool(true),
            };
            Ok((name.clone(), value))
        })
        .collect()
}

/// Render `_includes/<file>` with its params under `include`, tracing the
/// include as a dependency of the current dependent.
fn render_include(
    file: &str,
    params: &[(String, Param)],
    ctx: &mut RenderContext<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    let path = format!("_includes/{file}");
    ctx.trace(&path)?;

    let template = ctx.env.engine.include(file)?;
    let markup = Markup {
        args: Vec::new(),
        params: params.to_vec(),
    };
    let values: BTreeMap<String, Value> = resolve_params(&markup, ctx)?.into_iter().collect();

    let mut inner = ctx.with_dependent(&path)?;
    inner.push_scope(Scope::from([("include".to_owned(), Value::Map(values))]));
    out.push_str(&template.render(&mut inner)?);
    Ok(())
}

fn render_log(names: &[String], ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
    let mut line = String::new();
    for name in names {
        let value = ctx.get(name)?;
        line.push_str(&format!(" {name}={}", value.to_json()));
    }
    log!("log"; "{}", line.trim_start());
    Ok(())
}
