//! The fixed runtime library interface.
//!
//! Compiled programs do no I/O themselves; they call these eight
//! procedures and the emitted translation unit declares the ones a
//! program uses as `extern`. The definitions come from a small C
//! runtime linked in afterwards, so the prototypes here are the ABI
//! contract and must not drift.
//!
//! Booleans cross the boundary as `int` holding 0 or 1. Strings are
//! NUL-terminated `char` buffers; `getString` writes into a caller
//! buffer of [`STRING_CAPACITY`] bytes.

use crate::types::Type;

/// Fixed size of every string storage location, terminator included.
pub const STRING_CAPACITY: usize = 256;

/// Descriptor of one runtime procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeProc {
    pub name: &'static str,
    pub params: &'static [Type],
    pub ret: Option<Type>,
    /// The C declaration emitted when a program uses the procedure.
    pub prototype: &'static str,
}

/// Every runtime procedure, in the order they are declared into the
/// program scope. Later phases rely on this order being stable.
pub const RUNTIME_PROCS: &[RuntimeProc] = &[
    RuntimeProc {
        name: "getString",
        params: &[Type::String],
        ret: None,
        prototype: "extern void getString(char *dest);",
    },
    RuntimeProc {
        name: "putString",
        params: &[Type::String],
        ret: None,
        prototype: "extern void putString(const char *value);",
    },
    RuntimeProc {
        name: "getBool",
        params: &[],
        ret: Some(Type::Bool),
        prototype: "extern int getBool(void);",
    },
    RuntimeProc {
        name: "putBool",
        params: &[Type::Bool],
        ret: None,
        prototype: "extern void putBool(int value);",
    },
    RuntimeProc {
        name: "getInteger",
        params: &[],
        ret: Some(Type::Integer),
        prototype: "extern int getInteger(void);",
    },
    RuntimeProc {
        name: "putInteger",
        params: &[Type::Integer],
        ret: None,
        prototype: "extern void putInteger(int value);",
    },
    RuntimeProc {
        name: "getFloat",
        params: &[],
        ret: Some(Type::Float),
        prototype: "extern float getFloat(void);",
    },
    RuntimeProc {
        name: "putFloat",
        params: &[Type::Float],
        ret: None,
        prototype: "extern void putFloat(float value);",
    },
];

pub fn find_runtime_proc(name: &str) -> Option<&'static RuntimeProc> {
    for proc in RUNTIME_PROCS {
        if proc.name == name {
            return Some(proc);
        }
    }
    None
}
