//! Best-effort reconstruction of a parse tree around a syntax error.
//!
//! The machine mirrors block/method/type/field nesting in a parent-indexed
//! arena of recovered nodes. Tokens observed after the error drive the
//! transitions: an opening brace either supplies the brace an element was
//! still expecting or opens a nested block; a closing brace decrements the
//! element's bracket balance and pops to the parent once balanced, and a
//! brace the element does not own is re-delivered upward so the brace that
//! closes a nested block can also close the enclosing method or initializer.
//!
//! Recovered nodes are never patched into validity. The only way out is the
//! reconciliation pass ([`Recovery::updated_block`]), which asks every child
//! for its reconciled statement, drops the unparseable ones, and rebuilds the
//! statement list.

use quasar_core::Span;

use crate::ast::{Block, Expr, FieldDecl, LocalVarStmt, ParamDecl, Stmt, TypeDecl};

/// A grammar fragment reduced before or during recovery, handed to
/// [`Recovery::add`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Statement(Stmt),
    LocalVariable(LocalVarStmt),
    /// A bare argument-style declaration (`String s`), held as a pending
    /// argument and promoted into the next nested block if one opens
    /// immediately.
    Argument(ParamDecl),
    Field(FieldDecl),
    Type(TypeDecl),
}

impl Fragment {
    fn start(&self) -> usize {
        match self {
            Fragment::Statement(stmt) => stmt.range().start,
            Fragment::LocalVariable(stmt) => stmt.range.start,
            Fragment::Argument(param) => param.range.start,
            Fragment::Field(field) => field.range.start,
            Fragment::Type(decl) => decl.range().start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    /// The element recovery was entered for: a method or initializer body.
    Body,
    Block,
}

#[derive(Debug)]
struct Node {
    parent: Option<usize>,
    kind: NodeKind,
    /// Unmatched open braces owned by this element.
    bracket_balance: i32,
    found_opening_brace: bool,
    start: usize,
    /// `0` while the element is still open.
    end: usize,
    children: Vec<Child>,
    pending_args: Vec<ParamDecl>,
}

#[derive(Debug)]
enum Child {
    Stmt(Stmt),
    Nested(usize),
}

/// The recovery machine for one broken body.
#[derive(Debug)]
pub struct Recovery {
    nodes: Vec<Node>,
    current: usize,
    closed: bool,
}

impl Recovery {
    /// Start recovery for a body whose `{` was already consumed.
    pub fn for_body(start: usize) -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                kind: NodeKind::Body,
                bracket_balance: 1,
                found_opening_brace: true,
                start,
                end: 0,
                children: Vec::new(),
                pending_args: Vec::new(),
            }],
            current: 0,
            closed: false,
        }
    }

    /// Whether the outermost element has been closed by a brace.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Attach a freshly-reduced fragment to the innermost open element.
    ///
    /// A fragment starting past an element's already-known end belongs to an
    /// enclosing scope and is delegated to the parent. Field fragments are
    /// never kept where a local is expected: a `void` type or non-local
    /// modifiers mark a misparsed member, which is delegated outward and
    /// dropped here.
    pub fn add(&mut self, fragment: Fragment, _bracket_balance: i32) {
        if self.closed {
            return;
        }
        let mut target = self.current;
        let start = fragment.start();
        while let Some(parent) = self.nodes[target].parent {
            let end = self.nodes[target].end;
            if end != 0 && start > end {
                target = parent;
            } else {
                break;
            }
        }

        match fragment {
            Fragment::Argument(param) => {
                self.nodes[target].pending_args.push(param);
                return;
            }
            Fragment::Field(field) => {
                // Inside a body only locals make sense; a field here is a
                // misparse. Re-shape it as a local when plausible, otherwise
                // drop it at reconciliation time.
                if field.ty.is_void() {
                    return;
                }
                let local = LocalVarStmt {
                    modifiers: field.modifiers,
                    ty: field.ty,
                    name: field.name,
                    name_range: field.name_range,
                    initializer: field.initializer,
                    range: field.range,
                };
                self.nodes[target]
                    .children
                    .push(Child::Stmt(Stmt::LocalVar(local)));
            }
            Fragment::LocalVariable(local) => {
                self.nodes[target]
                    .children
                    .push(Child::Stmt(Stmt::LocalVar(local)));
            }
            Fragment::Type(decl) => {
                self.nodes[target]
                    .children
                    .push(Child::Stmt(Stmt::LocalType(decl)));
            }
            Fragment::Statement(stmt) => {
                self.nodes[target].children.push(Child::Stmt(stmt));
            }
        }
        self.current = target;
    }

    /// An opening brace either supplies the element's own expected brace or
    /// opens a nested block, promoting any pending arguments into it.
    pub fn on_opening_brace(&mut self, offset: usize) {
        if self.closed {
            return;
        }
        let node = &mut self.nodes[self.current];
        if !node.found_opening_brace {
            node.found_opening_brace = true;
            node.bracket_balance += 1;
            return;
        }
        let pending = std::mem::take(&mut node.pending_args);
        let parent = self.current;
        let mut children = Vec::new();
        for param in pending {
            children.push(Child::Stmt(Stmt::LocalVar(LocalVarStmt {
                modifiers: param.modifiers,
                ty: param.ty,
                name: param.name,
                name_range: param.name_range,
                initializer: None,
                range: param.range,
            })));
        }
        self.nodes.push(Node {
            parent: Some(parent),
            kind: NodeKind::Block,
            bracket_balance: 1,
            found_opening_brace: true,
            start: offset,
            end: 0,
            children,
            pending_args: Vec::new(),
        });
        self.current = self.nodes.len() - 1;
    }

    /// A closing brace balances the innermost element that still owns an open
    /// brace; a brace the current element does not own is re-delivered to the
    /// parent, which is how the brace closing a block can also close the
    /// enclosing body.
    pub fn on_closing_brace(&mut self, offset: usize) {
        if self.closed {
            return;
        }
        loop {
            let node = &mut self.nodes[self.current];
            if node.bracket_balance > 0 {
                node.bracket_balance -= 1;
                if node.bracket_balance == 0 {
                    node.end = offset + 1;
                    match node.parent {
                        Some(parent) => {
                            let id = self.current;
                            self.current = parent;
                            self.nodes[parent].children.push(Child::Nested(id));
                        }
                        None => self.closed = true,
                    }
                }
                return;
            }
            match node.parent {
                Some(parent) => self.current = parent,
                None => {
                    self.closed = true;
                    return;
                }
            }
        }
    }

    /// Reconcile the recovered tree into a [`Block`].
    ///
    /// Children reconcile recursively; a child with nothing parseable in it
    /// yields `None` and is dropped, never leaving a placeholder slot.
    pub fn updated_block(&mut self, fallback_end: usize) -> Block {
        self.flush_open();
        self.reconciled_block(0, fallback_end)
    }

    // Attach still-open nested nodes to their parents so reconciliation sees
    // them; they keep the unclosed sentinel.
    fn flush_open(&mut self) {
        let mut id = self.current;
        while let Some(parent) = self.nodes[id].parent {
            if self.nodes[id].end == 0 {
                let attached = self.nodes[parent]
                    .children
                    .iter()
                    .any(|c| matches!(c, Child::Nested(n) if *n == id));
                if !attached {
                    self.nodes[parent].children.push(Child::Nested(id));
                }
            }
            id = parent;
        }
    }

    fn reconciled_block(&self, id: usize, fallback_end: usize) -> Block {
        let node = &self.nodes[id];
        let mut statements = Vec::with_capacity(node.children.len());
        for child in &node.children {
            if let Some(stmt) = self.reconciled_statement(child, fallback_end) {
                statements.push(stmt);
            }
        }
        let end = if node.end != 0 { node.end } else { fallback_end };
        Block {
            statements,
            range: Span::new(node.start, end),
        }
    }

    fn reconciled_statement(&self, child: &Child, fallback_end: usize) -> Option<Stmt> {
        match child {
            Child::Nested(id) => Some(Stmt::Block(self.reconciled_block(*id, fallback_end))),
            Child::Stmt(stmt) => {
                if unparseable(stmt) {
                    None
                } else {
                    Some(stmt.clone())
                }
            }
        }
    }
}

fn unparseable(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Expr(expr_stmt) => matches!(expr_stmt.expr, Expr::Missing(_)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quasar_core::Span;

    use crate::ast::{ExprStmt, NameExpr, TypeRef};

    fn name_stmt(name: &str, start: usize, end: usize) -> Stmt {
        Stmt::Expr(ExprStmt {
            expr: Expr::Name(NameExpr {
                name: name.to_string(),
                range: Span::new(start, end),
            }),
            range: Span::new(start, end),
        })
    }

    fn missing_stmt(at: usize) -> Stmt {
        Stmt::Expr(ExprStmt {
            expr: Expr::Missing(Span::at(at)),
            range: Span::at(at),
        })
    }

    #[test]
    fn statements_survive_in_order_and_unparseable_ones_drop() {
        let mut recovery = Recovery::for_body(0);
        recovery.add(Fragment::Statement(name_stmt("a", 2, 3)), 1);
        recovery.add(Fragment::Statement(missing_stmt(5)), 1);
        recovery.add(Fragment::Statement(name_stmt("b", 7, 8)), 1);

        let block = recovery.updated_block(10);
        assert_eq!(block.statements.len(), 2);
        assert!(matches!(
            &block.statements[0],
            Stmt::Expr(ExprStmt { expr: Expr::Name(n), .. }) if n.name == "a"
        ));
        assert!(matches!(
            &block.statements[1],
            Stmt::Expr(ExprStmt { expr: Expr::Name(n), .. }) if n.name == "b"
        ));
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let mut recovery = Recovery::for_body(0);
        recovery.add(Fragment::Statement(name_stmt("a", 2, 3)), 1);
        recovery.add(Fragment::Statement(name_stmt("b", 4, 5)), 1);
        let first = recovery.updated_block(9);
        let second = recovery.updated_block(9);
        assert_eq!(first, second);
    }

    #[test]
    fn nested_block_opens_and_closes() {
        let mut recovery = Recovery::for_body(0);
        recovery.add(Fragment::Statement(name_stmt("a", 2, 3)), 1);
        recovery.on_opening_brace(4);
        recovery.add(Fragment::Statement(name_stmt("b", 5, 6)), 2);
        recovery.on_closing_brace(7);
        assert!(!recovery.is_closed());
        recovery.on_closing_brace(8);
        assert!(recovery.is_closed());

        let block = recovery.updated_block(9);
        assert_eq!(block.statements.len(), 2);
        match &block.statements[1] {
            Stmt::Block(inner) => {
                assert_eq!(inner.statements.len(), 1);
                assert_eq!(inner.range, Span::new(4, 8));
            }
            other => panic!("expected nested block, got {other:?}"),
        }
        assert_eq!(block.range, Span::new(0, 9));
    }

    #[test]
    fn pending_argument_promotes_into_next_block() {
        let mut recovery = Recovery::for_body(0);
        recovery.add(
            Fragment::Argument(ParamDecl {
                modifiers: Default::default(),
                ty: TypeRef {
                    name: "String".into(),
                    type_args: Vec::new(),
                    dimensions: 0,
                    range: Span::new(2, 8),
                },
                name: "s".into(),
                name_range: Span::new(9, 10),
                varargs: false,
                range: Span::new(2, 10),
            }),
            1,
        );
        recovery.on_opening_brace(12);
        recovery.on_closing_brace(13);
        recovery.on_closing_brace(14);

        let block = recovery.updated_block(15);
        let Stmt::Block(inner) = &block.statements[0] else {
            panic!("expected promoted block");
        };
        assert!(matches!(
            &inner.statements[0],
            Stmt::LocalVar(local) if local.name == "s"
        ));
    }

    #[test]
    fn void_field_fragment_is_rejected() {
        let mut recovery = Recovery::for_body(0);
        recovery.add(
            Fragment::Field(FieldDecl {
                modifiers: Default::default(),
                ty: TypeRef {
                    name: "void".into(),
                    type_args: Vec::new(),
                    dimensions: 0,
                    range: Span::new(1, 5),
                },
                name: "broken".into(),
                name_range: Span::new(6, 12),
                initializer: None,
                doc: None,
                range: Span::new(1, 12),
            }),
            1,
        );
        let block = recovery.updated_block(13);
        assert!(block.statements.is_empty());
    }

    #[test]
    fn eof_leaves_unclosed_nested_blocks_attached() {
        let mut recovery = Recovery::for_body(0);
        recovery.add(Fragment::Statement(name_stmt("a", 1, 2)), 1);
        recovery.on_opening_brace(3);
        recovery.add(Fragment::Statement(name_stmt("b", 4, 5)), 2);
        // End of input: nothing closes.
        let block = recovery.updated_block(6);
        assert_eq!(block.statements.len(), 2);
        assert!(matches!(&block.statements[1], Stmt::Block(_)));
    }
}
