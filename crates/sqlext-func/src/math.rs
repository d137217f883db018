//! Math catalog registered by [`FunctionRegistry::register_math`].
//!
//! Every entry goes through the NULL-propagating adapter, so a NULL argument
//! yields NULL without evaluation.
//!
//! # Value semantics
//! - Numeric text is coerced; non-numeric text and blobs are a type mismatch
//!   and fail the statement.
//! - An argument outside the function's domain (`sqrt(-1)`, `acos(2)`,
//!   `gamma(-1)`) fails the statement instead of producing NULL.
//! - Poles and overflow follow IEEE: `log(0)` is -Inf, `gamma(0)` is +Inf.
//! - `mod(x, 0)` is NULL.
//! - `floor` / `ceil` keep INTEGER inputs as INTEGER.
//!
//! # Omitted
//! `frexp` and `lgamma` produce two values and a scalar function can only
//! return one, so neither is in the catalog.
//!
//! [`FunctionRegistry::register_math`]: crate::FunctionRegistry::register_math
#![allow(clippy::cast_possible_truncation, clippy::float_cmp)]

use rusqlite::functions::FunctionFlags;
use sqlext_error::{ExtError, Result};
use sqlext_types::SqliteValue;

use crate::FunctionSpec;
use crate::scalar::{Args, Signature};

/// How a catalog entry computes its result.
#[derive(Debug, Clone, Copy)]
enum MathOp {
    /// `f(x)`.
    Unary(fn(f64) -> f64),
    /// `f(x, y)`.
    Binary(fn(f64, f64) -> f64),
    /// Integer-preserving rounding.
    Rounding(fn(f64) -> f64),
    /// `log(x [, base])`.
    Log,
    /// `mod(x, y)`.
    Mod,
    /// `ldexp(m, e)` = `m * 2^e`, without intermediate overflow.
    Ldexp,
    /// Zero-argument constant.
    Constant(f64),
}

impl MathOp {
    fn signature(self) -> Signature {
        match self {
            Self::Unary(_) | Self::Rounding(_) => Signature::exact(1),
            Self::Binary(_) | Self::Mod | Self::Ldexp => Signature::exact(2),
            Self::Log => Signature::with_optional(1, 1),
            Self::Constant(_) => Signature::exact(0),
        }
    }

    fn eval(self, name: &str, args: &Args<'_>) -> Result<Option<SqliteValue>> {
        match self {
            Self::Unary(f) => {
                let x = args.float(0)?;
                checked(name, &[x], f(x))
            }
            Self::Binary(f) => {
                let (x, y) = (args.float(0)?, args.float(1)?);
                checked(name, &[x, y], f(x, y))
            }
            Self::Rounding(f) => match args.value(0)? {
                SqliteValue::Integer(i) => Ok(Some(SqliteValue::Integer(*i))),
                _ => {
                    let x = args.float(0)?;
                    checked(name, &[x], f(x))
                }
            },
            Self::Log => {
                let x = args.float(0)?;
                if args.get(1).is_none() {
                    return checked(name, &[x], x.ln());
                }
                let base = args.float(1)?;
                checked(name, &[x, base], x.ln() / base.ln())
            }
            Self::Mod => {
                let (x, y) = (args.float(0)?, args.float(1)?);
                if y == 0.0 {
                    return Ok(None);
                }
                checked(name, &[x, y], x % y)
            }
            Self::Ldexp => {
                let m = args.float(0)?;
                let e = args.float(1)?.trunc();
                let e = e.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
                checked(name, &[m], libm::ldexp(m, e))
            }
            Self::Constant(c) => Ok(Some(SqliteValue::Float(c))),
        }
    }
}

/// Wrap a REAL result. NaN produced from non-NaN inputs means an argument was
/// outside the function's domain.
fn checked(name: &str, inputs: &[f64], result: f64) -> Result<Option<SqliteValue>> {
    if result.is_nan() && !inputs.iter().any(|x| x.is_nan()) {
        return Err(ExtError::function_error(format!(
            "numerical argument is out of domain - {name}"
        )));
    }
    Ok(Some(SqliteValue::float_result_or_null(result)))
}

const CATALOG: &[(&str, MathOp)] = &[
    // Roots and powers
    ("sqrt", MathOp::Unary(f64::sqrt)),
    ("cbrt", MathOp::Unary(f64::cbrt)),
    ("pow", MathOp::Binary(f64::powf)),
    ("power", MathOp::Binary(f64::powf)),
    ("hypot", MathOp::Binary(f64::hypot)),
    ("ldexp", MathOp::Ldexp),
    // Trigonometric
    ("sin", MathOp::Unary(f64::sin)),
    ("cos", MathOp::Unary(f64::cos)),
    ("tan", MathOp::Unary(f64::tan)),
    ("asin", MathOp::Unary(f64::asin)),
    ("acos", MathOp::Unary(f64::acos)),
    ("atan", MathOp::Unary(f64::atan)),
    ("atan2", MathOp::Binary(f64::atan2)),
    // Hyperbolic
    ("sinh", MathOp::Unary(f64::sinh)),
    ("cosh", MathOp::Unary(f64::cosh)),
    ("tanh", MathOp::Unary(f64::tanh)),
    ("asinh", MathOp::Unary(f64::asinh)),
    ("acosh", MathOp::Unary(f64::acosh)),
    ("atanh", MathOp::Unary(f64::atanh)),
    // Logarithmic / Exponential
    ("exp", MathOp::Unary(f64::exp)),
    ("log", MathOp::Log),
    ("log2", MathOp::Unary(f64::log2)),
    ("log10", MathOp::Unary(f64::log10)),
    // Special functions
    ("erf", MathOp::Unary(libm::erf)),
    ("erfc", MathOp::Unary(libm::erfc)),
    ("gamma", MathOp::Unary(libm::tgamma)),
    // Rounding and remainder
    ("floor", MathOp::Rounding(f64::floor)),
    ("ceil", MathOp::Rounding(f64::ceil)),
    ("ceiling", MathOp::Rounding(f64::ceil)),
    ("mod", MathOp::Mod),
    // Constants
    ("pi", MathOp::Constant(std::f64::consts::PI)),
    ("e", MathOp::Constant(std::f64::consts::E)),
];

/// Names in the catalog, in catalog order.
pub fn catalog_names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|(name, _)| *name)
}

/// Build a fresh spec for every catalog entry.
pub fn catalog() -> Vec<FunctionSpec> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    CATALOG
        .iter()
        .map(|&(name, op)| {
            FunctionSpec::null_propagating(name.to_owned(), op.signature(), flags, move |args| {
                op.eval(name, args)
            })
        })
        .collect()
}
