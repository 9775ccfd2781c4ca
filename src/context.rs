//! Lexical context: the enclosing declarations open at a point in a document.
//!
//! Each document traversal owns one [`DocumentContext`]. Entering a
//! declaration body goes through [`ContextStack::enter`], whose guard pops on
//! drop, so every exit path leaves the stack balanced.

use std::ops::{Deref, DerefMut};

use serde::Serialize;

use crate::types::EntityKind;

/// Stack of open path prefixes for one entity kind.
#[derive(Debug, Default, Clone)]
pub struct ContextStack {
    /// Open entries, outermost first. Each entry is a path string as written.
    entries: Vec<String>,
    /// Number of pops that found the stack already empty.
    underflows: u32,
}

impl ContextStack {
    /// Push `entry` and return a guard that pops it when dropped.
    pub fn enter(&mut self, entry: impl Into<String>) -> ScopeGuard<'_> {
        self.push(entry);
        return ScopeGuard { stack: self };
    }

    /// Open entries, outermost first.
    pub fn entries(&self) -> &[String] {
        return &self.entries;
    }

    /// Whether no declaration is open.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Create an empty stack.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Close the innermost entry.
    ///
    /// Popping an empty stack is an imbalance: it is counted, logged, and
    /// otherwise treated as a no-op.
    pub fn pop(&mut self) -> Option<String> {
        let popped = self.entries.pop();
        if popped.is_none() {
            self.underflows = self.underflows.saturating_add(1);
            tracing::warn!("lexical context popped while already empty");
        }
        return popped;
    }

    /// Open a new innermost entry.
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// Number of unmatched pops seen so far.
    pub const fn underflows(&self) -> u32 {
        return self.underflows;
    }
}

/// Pops its stack entry when dropped.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    /// The stack this guard pushed onto.
    stack: &'a mut ContextStack,
}

impl Deref for ScopeGuard<'_> {
    type Target = ContextStack;

    /// Read the underlying stack.
    fn deref(&self) -> &Self::Target {
        return self.stack;
    }
}

impl DerefMut for ScopeGuard<'_> {
    /// Nest further scopes through the guard.
    fn deref_mut(&mut self) -> &mut Self::Target {
        return self.stack;
    }
}

impl Drop for ScopeGuard<'_> {
    /// Close the scope this guard opened.
    fn drop(&mut self) {
        let _ = self.stack.pop();
    }
}

/// Per-document lexical context: independent option and function stacks.
///
/// Packages never nest, so they have no stack.
#[derive(Debug, Default, Clone)]
pub struct DocumentContext {
    /// Open function declarations.
    pub functions: ContextStack,
    /// Open option declarations.
    pub options: ContextStack,
}

impl DocumentContext {
    /// Create a context with both stacks empty.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Capture the current stacks for a reference written at this point.
    pub fn snapshot(&self) -> Scopes {
        return Scopes {
            functions: self.functions.entries().to_vec(),
            options: self.options.entries().to_vec(),
        };
    }

    /// The stack that `kind` nests in, if any.
    pub fn stack_mut(&mut self, kind: EntityKind) -> Option<&mut ContextStack> {
        return match kind {
            EntityKind::Function => Some(&mut self.functions),
            EntityKind::Option => Some(&mut self.options),
            EntityKind::Package => None,
        };
    }
}

/// Frozen context captured where a reference is written.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Scopes {
    /// Function context entries, outermost first.
    pub functions: Vec<String>,
    /// Option context entries, outermost first.
    pub options: Vec<String>,
}

impl Scopes {
    /// Context entries that apply to references of `kind`.
    pub fn for_kind(&self, kind: EntityKind) -> &[String] {
        return match kind {
            EntityKind::Function => &self.functions,
            EntityKind::Option => &self.options,
            EntityKind::Package => &[],
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_pops_on_drop() {
        let mut stack = ContextStack::new();
        {
            let mut outer = stack.enter("services.nginx");
            {
                let inner = outer.enter("virtualHosts.<name>");
                assert_eq!(inner.entries(), ["services.nginx", "virtualHosts.<name>"]);
            }
            assert_eq!(outer.entries(), ["services.nginx"]);
        }
        assert!(stack.is_empty(), "stack should be balanced after guards drop");
        assert_eq!(stack.underflows(), 0);
    }

    #[test]
    fn guard_pops_on_early_return() {
        fn declare(stack: &mut ContextStack, fail: bool) -> Result<(), ()> {
            let _scope = stack.enter("a");
            if fail {
                return Err(());
            }
            return Ok(());
        }

        let mut stack = ContextStack::new();
        assert!(declare(&mut stack, true).is_err(), "declare should fail");
        assert!(stack.is_empty(), "error path must still pop");
    }

    #[test]
    fn pop_on_empty_is_counted_not_fatal() {
        let mut stack = ContextStack::new();
        assert_eq!(stack.pop(), None);
        stack.push("a");
        assert_eq!(stack.pop().as_deref(), Some("a"));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.underflows(), 2);
        assert!(stack.is_empty(), "stack stays empty after underflow");
    }

    #[test]
    fn option_and_function_stacks_are_independent() {
        let mut context = DocumentContext::new();
        context.options.push("services.foo");
        context.functions.push("lib.strings");

        let scopes = context.snapshot();
        assert_eq!(scopes.for_kind(EntityKind::Option), ["services.foo"]);
        assert_eq!(scopes.for_kind(EntityKind::Function), ["lib.strings"]);
        assert!(scopes.for_kind(EntityKind::Package).is_empty(), "packages have no context");
        assert!(context.stack_mut(EntityKind::Package).is_none(), "packages never nest");
    }
}
