//! Tree-walking evaluator. Values follow JavaScript rules: strict equality,
//! truthiness, `&&`/`||` yielding an operand, and number coercion for the
//! relational operators.
use std::cmp::Ordering;
use std::fmt;

use serde_json::{Number, Value};

use super::parser::{BinaryOp, Expr, Reference, Root, Segment};

/// A JSON value, or JavaScript's `undefined` (what a missing path resolves to).
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Undefined,
    Json(Value),
}

/// Read-only roots an expression may reference. Only `state` is mandatory.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub state: &'a Value,
    pub props: Option<&'a Value>,
    pub env: Option<&'a Value>,
    pub data: Option<&'a Value>,
}

impl<'a> EvalContext<'a> {
    pub fn new(state: &'a Value) -> Self {
        Self {
            state,
            props: None,
            env: None,
            data: None,
        }
    }

    pub fn with_props(mut self, props: &'a Value) -> Self {
        self.props = Some(props);
        self
    }

    pub fn with_env(mut self, env: &'a Value) -> Self {
        self.env = Some(env);
        self
    }

    pub fn with_data(mut self, data: &'a Value) -> Self {
        self.data = Some(data);
        self
    }

    fn root(&self, root: Root) -> Option<&'a Value> {
        match root {
            Root::State => Some(self.state),
            Root::Props => self.props,
            Root::Env => self.env,
            Root::Data => self.data,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALUES
// ————————————————————————————————————————————————————————————————————————————

impl EvalValue {
    pub fn from_f64(n: f64) -> Self {
        if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
            return EvalValue::Json(Value::from(n as i64));
        }
        match Number::from_f64(n) {
            Some(num) => EvalValue::Json(Value::Number(num)),
            // NaN and the infinities have no JSON form
            None => EvalValue::Json(Value::Null),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            EvalValue::Undefined => false,
            EvalValue::Json(Value::Null) => false,
            EvalValue::Json(Value::Bool(b)) => *b,
            EvalValue::Json(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0 && !x.is_nan()),
            EvalValue::Json(Value::String(s)) => !s.is_empty(),
            EvalValue::Json(Value::Array(_) | Value::Object(_)) => true,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, EvalValue::Undefined)
    }

    /// `undefined` has no JSON form and becomes `null`.
    pub fn to_json(&self) -> Value {
        match self {
            EvalValue::Undefined => Value::Null,
            EvalValue::Json(v) => v.clone(),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            EvalValue::Undefined => None,
            EvalValue::Json(v) => Some(v),
        }
    }

    /// `===`
    pub fn strict_eq(&self, other: &EvalValue) -> bool {
        match (self, other) {
            (EvalValue::Undefined, EvalValue::Undefined) => true,
            (EvalValue::Json(a), EvalValue::Json(b)) => json_eq(a, b),
            _ => false,
        }
    }

    /// JavaScript `Number(x)`. Objects and arrays give NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            EvalValue::Undefined => f64::NAN,
            EvalValue::Json(Value::Null) => 0.0,
            EvalValue::Json(Value::Bool(b)) => f64::from(u8::from(*b)),
            EvalValue::Json(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            EvalValue::Json(Value::String(s)) => string_to_number(s),
            EvalValue::Json(Value::Array(_) | Value::Object(_)) => f64::NAN,
        }
    }
}

impl From<Value> for EvalValue {
    fn from(value: Value) -> Self {
        EvalValue::Json(value)
    }
}

impl From<bool> for EvalValue {
    fn from(b: bool) -> Self {
        EvalValue::Json(Value::Bool(b))
    }
}

impl fmt::Display for EvalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalValue::Undefined => f.write_str("undefined"),
            EvalValue::Json(v) => write!(f, "{v}"),
        }
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len() && xs.iter().all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust also accepts "inf" and "nan"; JavaScript does not.
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

// ————————————————————————————————————————————————————————————————————————————
// EVALUATION
// ————————————————————————————————————————————————————————————————————————————

impl Expr {
    /// Evaluation itself cannot fail: unknown paths are `undefined` and every
    /// operator is total.
    pub fn eval(&self, ctx: &EvalContext<'_>) -> EvalValue {
        match self {
            Expr::Literal(v) => v.clone(),
            Expr::Ref(r) => resolve(r, ctx),
            Expr::Not(inner) => EvalValue::from(!inner.eval(ctx).is_truthy()),
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::And => {
                    let l = lhs.eval(ctx);
                    if l.is_truthy() { rhs.eval(ctx) } else { l }
                }
                BinaryOp::Or => {
                    let l = lhs.eval(ctx);
                    if l.is_truthy() { l } else { rhs.eval(ctx) }
                }
                BinaryOp::StrictEq => EvalValue::from(lhs.eval(ctx).strict_eq(&rhs.eval(ctx))),
                BinaryOp::StrictNe => EvalValue::from(!lhs.eval(ctx).strict_eq(&rhs.eval(ctx))),
                BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                    let ordering = compare(&lhs.eval(ctx), &rhs.eval(ctx));
                    let holds = match (op, ordering) {
                        (_, None) => false,
                        (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
                        (BinaryOp::Le, Some(o)) => o != Ordering::Greater,
                        (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
                        (_, Some(o)) => o != Ordering::Less,
                    };
                    EvalValue::from(holds)
                }
            },
        }
    }
}

/// Two strings compare lexicographically; anything else compares as numbers,
/// and NaN makes the comparison false.
fn compare(lhs: &EvalValue, rhs: &EvalValue) -> Option<Ordering> {
    if let (EvalValue::Json(Value::String(a)), EvalValue::Json(Value::String(b))) = (lhs, rhs) {
        return Some(a.cmp(b));
    }
    lhs.to_number().partial_cmp(&rhs.to_number())
}

fn resolve(reference: &Reference, ctx: &EvalContext<'_>) -> EvalValue {
    let Some(mut current) = ctx.root(reference.root) else {
        return EvalValue::Undefined;
    };
    let last = reference.segments.len().saturating_sub(1);
    for (depth, segment) in reference.segments.iter().enumerate() {
        let next = match (segment, current) {
            (Segment::Key(k), Value::Object(map)) => map.get(k),
            (Segment::Index(i), Value::Array(xs)) => xs.get(*i),
            (Segment::Index(i), Value::Object(map)) => map.get(&i.to_string()),
            // a number has no further properties
            (Segment::Key(k), Value::Array(xs)) if k == "length" => {
                return if depth == last {
                    EvalValue::from_f64(xs.len() as f64)
                } else {
                    EvalValue::Undefined
                };
            }
            (Segment::Key(k), Value::Array(xs)) => k.parse::<usize>().ok().and_then(|i| xs.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return EvalValue::Undefined,
        }
    }
    EvalValue::Json(current.clone())
}
