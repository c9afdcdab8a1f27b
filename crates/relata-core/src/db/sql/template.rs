use crate::{
    db::sql::{Dialect, SqlParam, SqlStatement},
    error::{ErrorOrigin, InternalError, MappingError},
    value::Value,
};

/// Rewrite each `?` of a raw template into a dialect placeholder (`@p0`, `@p1`,
/// ...), binding `args` in order. A `?` inside a single-quoted literal is text
/// and stays as written.
pub fn expand(dialect: Dialect, template: &str, args: &[Value]) -> Result<SqlStatement, InternalError> {
    let mut text = String::with_capacity(template.len() + args.len() * 3);
    let mut params = Vec::with_capacity(args.len());
    let mut quoted = false;
    let mut found = 0usize;

    for ch in template.chars() {
        match ch {
            '\'' => {
                quoted = !quoted;
                text.push(ch);
            }
            '?' if !quoted => {
                let name = format!("{}p{found}", dialect.param_prefix());
                text.push_str(&name);
                if let Some(value) = args.get(found) {
                    params.push(SqlParam {
                        name,
                        value: value.clone(),
                    });
                }
                found += 1;
            }
            _ => text.push(ch),
        }
    }

    if found != args.len() {
        return Err(InternalError::mapping(
            ErrorOrigin::Compile,
            MappingError::TemplateArity {
                expected: found,
                found: args.len(),
            },
        ));
    }

    Ok(SqlStatement::with_params(text, params))
}
