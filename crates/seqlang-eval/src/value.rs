//! Runtime values: numbers, sequences and the `Var` union.

use std::ops::Range;
use std::sync::Arc;

// ══════════════════════════════════════════════════════════════════════════════
// Num
// ══════════════════════════════════════════════════════════════════════════════

/// A number: a 64-bit integer or a double.
///
/// Integer arithmetic stays integral while the result is exact and wraps on
/// overflow. Anything involving a `Real` is computed in `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Integer(i64),
    Real(f64),
}

/// The binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl ArithOp {
    /// Map operator text as written in the source.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            "^" => Some(Self::Pow),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
        }
    }
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(i) => i as f64,
            Self::Real(r) => r,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Self::Integer(_))
    }

    pub fn apply(self, op: ArithOp, rhs: Num) -> Num {
        match op {
            ArithOp::Add => self.add(rhs),
            ArithOp::Sub => self.sub(rhs),
            ArithOp::Mul => self.mul(rhs),
            ArithOp::Div => self.div(rhs),
            ArithOp::Pow => self.pow(rhs),
        }
    }

    pub fn add(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Self::Integer(a), Self::Integer(b)) => Self::Integer(a.wrapping_add(b)),
            _ => Self::Real(self.as_f64() + rhs.as_f64()),
        }
    }

    pub fn sub(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Self::Integer(a), Self::Integer(b)) => Self::Integer(a.wrapping_sub(b)),
            _ => Self::Real(self.as_f64() - rhs.as_f64()),
        }
    }

    pub fn mul(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Self::Integer(a), Self::Integer(b)) => Self::Integer(a.wrapping_mul(b)),
            _ => Self::Real(self.as_f64() * rhs.as_f64()),
        }
    }

    /// Integer only when the division is exact; `x / 0` is `±Infinity`
    /// and `0 / 0` is `NaN`.
    pub fn div(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Self::Integer(a), Self::Integer(b)) if b != 0 && a.wrapping_rem(b) == 0 => {
                Self::Integer(a.wrapping_div(b))
            }
            _ => Self::Real(self.as_f64() / rhs.as_f64()),
        }
    }

    pub fn pow(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Self::Integer(base), Self::Integer(exp)) => int_pow(base, exp),
            _ => {
                let (base, exp) = (self.as_f64(), rhs.as_f64());
                if base == 0.0 {
                    if exp < 0.0 {
                        return Self::Real(f64::INFINITY);
                    }
                    if exp > 0.0 {
                        return Self::Real(0.0);
                    }
                    if exp == 0.0 {
                        return Self::Real(1.0);
                    }
                }
                Self::Real(base.powf(exp))
            }
        }
    }

    /// Unary minus; keeps the variant.
    pub fn neg(self) -> Num {
        match self {
            Self::Integer(i) => Self::Integer(i.wrapping_neg()),
            Self::Real(r) => Self::Real(-r),
        }
    }
}

fn int_pow(base: i64, exp: i64) -> Num {
    match base {
        0 if exp < 0 => return Num::Real(f64::INFINITY),
        0 if exp == 0 => return Num::Integer(1),
        0 => return Num::Integer(0),
        1 => return Num::Integer(1),
        -1 => return Num::Integer(if exp % 2 == 0 { 1 } else { -1 }),
        _ => {}
    }
    if exp >= 0 {
        if let Some(exact) = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
            return Num::Integer(exact);
        }
    }
    Num::Real((base as f64).powf(exp as f64))
}

impl From<i64> for Num {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Num {
    fn from(r: f64) -> Self {
        Self::Real(r)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Var
// ══════════════════════════════════════════════════════════════════════════════

/// Any value a variable or expression can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Var {
    Num(Num),
    Seq(Seq),
}

impl Var {
    pub fn as_num(&self) -> Option<Num> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Seq(_) => None,
        }
    }

    pub fn as_seq(&self) -> Option<&Seq> {
        match self {
            Self::Seq(s) => Some(s),
            Self::Num(_) => None,
        }
    }
}

impl From<Num> for Var {
    fn from(n: Num) -> Self {
        Self::Num(n)
    }
}

impl From<Seq> for Var {
    fn from(s: Seq) -> Self {
        Self::Seq(s)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Seq
// ══════════════════════════════════════════════════════════════════════════════

/// A finite ordered sequence of values.
///
/// A bounds-derived sequence `{from, to}` never materializes its elements;
/// a list-derived one (the result of `map`) holds them behind an `Arc` so
/// clones are cheap.
#[derive(Debug, Clone)]
pub struct Seq {
    repr: Repr,
}

#[derive(Debug, Clone)]
enum Repr {
    /// Contiguous integers `from..=to`, `from <= to`.
    Range { from: i64, to: i64 },
    List(Arc<Vec<Var>>),
}

impl Seq {
    /// The integers `from..=to`. Empty when `from > to`.
    pub fn range(from: i64, to: i64) -> Self {
        if from > to {
            return Self::empty();
        }
        Self {
            repr: Repr::Range { from, to },
        }
    }

    pub fn from_vec(elements: Vec<Var>) -> Self {
        Self {
            repr: Repr::List(Arc::new(elements)),
        }
    }

    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn size(&self) -> usize {
        match &self.repr {
            Repr::Range { from, to } => {
                let span = i128::from(*to) - i128::from(*from) + 1;
                usize::try_from(span).unwrap_or(usize::MAX)
            }
            Repr::List(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn get(&self, index: usize) -> Option<Var> {
        if index >= self.size() {
            return None;
        }
        match &self.repr {
            Repr::Range { from, .. } => {
                Some(Var::Num(Num::Integer(from.wrapping_add(index as i64))))
            }
            Repr::List(items) => items.get(index).cloned(),
        }
    }

    pub fn iter(&self) -> SeqIter<'_> {
        self.elements_in(0..self.size())
    }

    /// Elements at positions `range`, clamped to the sequence.
    pub fn elements_in(&self, range: Range<usize>) -> SeqIter<'_> {
        let end = range.end.min(self.size());
        let start = range.start.min(end);
        match &self.repr {
            Repr::Range { from, .. } => SeqIter::Range {
                next: from.wrapping_add(start as i64),
                remaining: end - start,
            },
            Repr::List(items) => SeqIter::List(items[start..end].iter()),
        }
    }
}

impl PartialEq for Seq {
    fn eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Range { from: a, to: b }, Repr::Range { from: c, to: d }) => a == c && b == d,
            _ => self.size() == other.size() && self.iter().eq(other.iter()),
        }
    }
}

/// Iterator over a [`Seq`], yielding owned elements.
#[derive(Debug, Clone)]
pub enum SeqIter<'a> {
    Range { next: i64, remaining: usize },
    List(std::slice::Iter<'a, Var>),
}

impl Iterator for SeqIter<'_> {
    type Item = Var;

    fn next(&mut self) -> Option<Var> {
        match self {
            Self::Range { next, remaining } => {
                if *remaining == 0 {
                    return None;
                }
                let value = *next;
                *next = next.wrapping_add(1);
                *remaining -= 1;
                Some(Var::Num(Num::Integer(value)))
            }
            Self::List(items) => items.next().cloned(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = match self {
            Self::Range { remaining, .. } => *remaining,
            Self::List(items) => items.len(),
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for SeqIter<'_> {}
