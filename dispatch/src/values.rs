use std::cell::RefCell;

use object::Value;

use crate::Condition;

thread_local! {
    /// Values after the primary one of the last multiple-value return.
    static MULTIPLE_VALUES: RefCell<Vec<Value>> = const { RefCell::new(Vec::new()) };
}

/// The native two-register return convention: the primary value and the
/// total number of values. The rest are in the thread's multiple-values
/// buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnType {
    pub ret0: Value,
    pub nvals: usize,
}

impl ReturnType {
    /// Value `index` of this return, nil past the end.
    pub fn value(self, index: usize) -> Value {
        match index {
            _ if index >= self.nvals => Value::nil(),
            0 => self.ret0,
            _ => MULTIPLE_VALUES.with_borrow(|buffer| {
                buffer.get(index - 1).copied().unwrap_or_default()
            }),
        }
    }

    /// Collect the return back into owned values.
    pub fn into_values(self) -> MultipleValues {
        MultipleValues::new((0..self.nvals).map(|i| self.value(i)).collect())
    }
}

/// Zero or more values returned by a Lisp function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipleValues(Vec<Value>);

impl MultipleValues {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn single(value: Value) -> Self {
        Self(vec![value])
    }

    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first value, nil when there are none.
    pub fn primary(&self) -> Value {
        self.0.first().copied().unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Spill into the native convention, secondary values going to the
    /// thread-local buffer.
    pub fn into_return(self, limit: usize) -> Result<ReturnType, Condition> {
        let count = self.0.len();
        if count > limit {
            return Err(Condition::TooManyValues { count, limit });
        }
        let ret0 = self.primary();
        MULTIPLE_VALUES.with_borrow_mut(|buffer| {
            buffer.clear();
            buffer.extend(self.0.into_iter().skip(1));
        });
        Ok(ReturnType { ret0, nvals: count })
    }
}

impl From<Value> for MultipleValues {
    fn from(value: Value) -> Self {
        Self::single(value)
    }
}
