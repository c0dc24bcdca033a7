//! Symbol table shared by the type checker and the code generator.
//!
//! Declarations live in one arena and are addressed by [`DeclId`];
//! scopes only map names to ids. Scopes form a stack that mirrors the
//! procedure nesting being checked, so name resolution walks the
//! ancestor chain. A separate index keeps `global` declarations
//! resolvable from anywhere, even after their declaring scope is
//! gone.

use std::collections::HashMap;

use crate::span::Span;
use crate::types::Type;

/// Stable handle to a declaration. Ids are dense and allocated in
/// declaration order, which later phases rely on for deterministic
/// output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Variable {
        ty: Type,
        is_param: bool,
    },
    Procedure {
        params: Vec<Type>,
        ret: Option<Type>,
        /// Provided by the runtime library rather than the program.
        runtime: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub is_global: bool,
    pub span: Span,
    /// Procedure whose scope holds this declaration; `None` for the
    /// program level.
    pub owner: Option<DeclId>,
}

#[derive(Debug)]
struct Scope {
    names: HashMap<String, DeclId>,
    owner: Option<DeclId>,
}

#[derive(Debug)]
pub struct SymbolTable {
    decls: Vec<Declaration>,
    scopes: Vec<Scope>,
    globals: HashMap<String, DeclId>,
}

impl SymbolTable {
    /// An empty table with the program-level scope already open.
    pub fn new() -> Self {
        SymbolTable {
            decls: Vec::new(),
            scopes: vec![Scope {
                names: HashMap::new(),
                owner: None,
            }],
            globals: HashMap::new(),
        }
    }

    pub fn enter_scope(&mut self, owner: DeclId) {
        self.scopes.push(Scope {
            names: HashMap::new(),
            owner: Some(owner),
        });
    }

    /// Pop the innermost scope. Declarations made in it stay in the
    /// arena; only their names stop resolving.
    pub fn exit_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot exit the program scope");
        self.scopes.pop();
    }

    /// Procedure owning the innermost scope, `None` at program level.
    pub fn current_owner(&self) -> Option<DeclId> {
        self.scopes
            .last()
            .expect("the program scope is never popped")
            .owner
    }

    /// Add a declaration to the innermost scope.
    ///
    /// Fails when the name is already taken in that scope, or, for a
    /// `global` declaration, anywhere in the global index. The error
    /// carries the earlier declaration so callers can point at it.
    pub fn declare(
        &mut self,
        name: &str,
        kind: DeclKind,
        is_global: bool,
        span: Span,
    ) -> Result<DeclId, DeclId> {
        let owner = self.current_owner();
        let scope = self
            .scopes
            .last_mut()
            .expect("the program scope is never popped");
        if let Some(&existing) = scope.names.get(name) {
            return Err(existing);
        }
        if is_global {
            if let Some(&existing) = self.globals.get(name) {
                return Err(existing);
            }
        }

        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Declaration {
            name: name.to_string(),
            kind,
            is_global,
            span,
            owner,
        });
        scope.names.insert(name.to_string(), id);
        if is_global {
            self.globals.insert(name.to_string(), id);
        }
        Ok(id)
    }

    /// Resolve a name from the innermost scope outward, then through
    /// the global index. Inner declarations shadow outer ones and
    /// locals shadow globals.
    pub fn resolve(&self, name: &str) -> Option<DeclId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&id) = scope.names.get(name) {
                return Some(id);
            }
        }
        self.globals.get(name).copied()
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }

    /// All declarations in allocation order.
    pub fn decls(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(index, decl)| (DeclId(index as u32), decl))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
