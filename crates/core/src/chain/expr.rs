use std::f64::consts;
use std::sync::LazyLock;

use evalexpr::{
    ContextWithMutableFunctions, ContextWithMutableVariables, EvalexprError,
    EvalexprResult, Function, HashMapContext, Value,
};
use regex::Regex;

use super::Error;

static LIBRARY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:math|numpy|np)\.").expect("library prefix regex must compile")
});

const UNARY_FUNCTIONS: &[(&str, fn(f64) -> f64)] = &[
    ("sqrt", f64::sqrt),
    ("cbrt", f64::cbrt),
    ("exp", f64::exp),
    ("ln", f64::ln),
    ("log10", f64::log10),
    ("log2", f64::log2),
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("asin", f64::asin),
    ("acos", f64::acos),
    ("atan", f64::atan),
    ("sinh", f64::sinh),
    ("cosh", f64::cosh),
    ("tanh", f64::tanh),
    ("abs", f64::abs),
    ("radians", f64::to_radians),
    ("degrees", f64::to_degrees),
];

/// Evaluates a single-line arithmetic expression and formats the result.
///
/// The expression may use Python-style `**` for powers, `math.` prefixed
/// names and the constants `pi` and `e`. Integer literals are evaluated as
/// floats, so `1/5` is `0.2`. Integral results print without a fraction.
pub fn evaluate(expression: &str) -> Result<String, Error> {
    let normalized = normalize(expression);
    trace!("evaluating {normalized:?}");

    let fail = |reason: String| Error::Evaluation {
        expression: expression.to_owned(),
        reason,
    };
    let context = context().map_err(|err| fail(err.to_string()))?;
    let value = evalexpr::eval_with_context(&normalized, &context)
        .map_err(|err| fail(err.to_string()))?;

    match value {
        Value::Float(f) if !f.is_finite() => {
            Err(fail(format!("result is not a finite number ({f})")))
        }
        Value::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            Ok(format!("{}", f as i64))
        }
        Value::Float(f) => Ok(format!("{f}")),
        Value::Int(i) => Ok(format!("{i}")),
        Value::Boolean(b) => Ok(format!("{b}")),
        other => Err(fail(format!("unsupported result: {other}"))),
    }
}

fn normalize(expression: &str) -> String {
    let expression = LIBRARY_PREFIX.replace_all(expression.trim(), "");
    let expression = expression.replace("**", "^").replace('π', "pi");
    floatify_integers(&expression)
}

/// Appends `.0` to bare integer literals.
fn floatify_integers(expression: &str) -> String {
    let chars: Vec<char> = expression.chars().collect();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::with_capacity(expression.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !c.is_ascii_digit() {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        out.extend(&chars[start..i]);

        let before = start.checked_sub(1).map(|idx| chars[idx]);
        let after = chars.get(i).copied();
        let part_of_other_token = before.is_some_and(|c| is_word(c) || c == '.')
            || after.is_some_and(|c| is_word(c) || c == '.');
        if !part_of_other_token {
            out.push_str(".0");
        }
    }
    out
}

fn context() -> EvalexprResult<HashMapContext> {
    let mut context = HashMapContext::new();
    context.set_value("pi".to_owned(), Value::Float(consts::PI))?;
    context.set_value("e".to_owned(), Value::Float(consts::E))?;
    context.set_value("tau".to_owned(), Value::Float(consts::TAU))?;

    for &(name, f) in UNARY_FUNCTIONS {
        context.set_function(
            name.to_owned(),
            Function::new(move |arg| Ok(Value::Float(f(arg.as_number()?)))),
        )?;
    }
    context.set_function(
        "pow".to_owned(),
        Function::new(|arg| {
            let [base, exp] = two_numbers(arg)?;
            Ok(Value::Float(base.powf(exp)))
        }),
    )?;
    // `log(x)` is the natural log, `log(x, base)` the log to `base`.
    context.set_function(
        "log".to_owned(),
        Function::new(|arg| match arg {
            Value::Tuple(_) => {
                let [x, base] = two_numbers(arg)?;
                Ok(Value::Float(x.log(base)))
            }
            _ => Ok(Value::Float(arg.as_number()?.ln())),
        }),
    )?;
    Ok(context)
}

fn two_numbers(arg: &Value) -> EvalexprResult<[f64; 2]> {
    let tuple = arg.as_tuple()?;
    match tuple.as_slice() {
        [a, b] => Ok([a.as_number()?, b.as_number()?]),
        _ => Err(EvalexprError::CustomMessage(format!(
            "expected 2 arguments, got {}",
            tuple.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(expression: &str) -> f64 {
        evaluate(expression).unwrap().parse().unwrap()
    }

    #[test]
    fn test_integral_results() {
        assert_eq!(evaluate("37593 * 67").unwrap(), "2518731");
        assert_eq!(evaluate("2**10").unwrap(), "1024");
        assert_eq!(evaluate("(3 + 5) / 2").unwrap(), "4");
    }

    #[test]
    fn test_float_results() {
        assert_eq!(evaluate("1/5").unwrap(), "0.2");
        assert!((approx("37593**(1/5)") - 8.222831614237718).abs() < 1e-9);
        assert!((approx("pi") - std::f64::consts::PI).abs() < 1e-12);
        assert!(
            (approx("round(pi * 10^10) / 10^10") - 3.1415926536).abs() < 1e-12
        );
    }

    #[test]
    fn test_functions_and_prefixes() {
        assert_eq!(evaluate("math.sqrt(144)").unwrap(), "12");
        assert!((approx("log10(1000)") - 3.0).abs() < 1e-12);
        assert_eq!(evaluate("pow(2, 8)").unwrap(), "256");
        assert!((approx("log(8, 2)") - 3.0).abs() < 1e-12);
        assert!((approx("sin(π / 2)") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_floatify_integers() {
        assert_eq!(floatify_integers("1/5"), "1.0/5.0");
        assert_eq!(floatify_integers("log10(100)"), "log10(100.0)");
        assert_eq!(floatify_integers("2.5 * x2"), "2.5 * x2");
        assert_eq!(floatify_integers("1e3"), "1e3");
    }

    #[test]
    fn test_errors() {
        for expression in ["1 / 0", "2 +", "unknown_fn(2)", "\"text\""] {
            let err = evaluate(expression).unwrap_err();
            assert!(
                matches!(err, Error::Evaluation { .. }),
                "{expression}: {err}"
            );
        }
    }
}
