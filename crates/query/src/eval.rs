//! Query evaluation against note content.

use crate::ast::Expr;
use crate::parser::Parser;

/// A parsed query, built once per query string and evaluated against many
/// notes.
#[derive(Clone, Debug)]
pub struct Query {
    expr: Option<Expr>,
}

impl Query {
    pub fn parse(input: &str) -> Self {
        Self {
            expr: Parser::parse(input),
        }
    }

    /// An empty query matches no content at all; callers wanting "everything
    /// with tag X" list instead of searching.
    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    pub fn expr(&self) -> Option<&Expr> {
        self.expr.as_ref()
    }

    /// Evaluate against one note's content. `None` means no match;
    /// `Some(score)` is the total occurrence count of every positive term
    /// and phrase, an ordering signal rather than a normalized similarity.
    pub fn evaluate(&self, content: &str) -> Option<usize> {
        let expr = self.expr.as_ref()?;
        let folded = content.to_lowercase();
        if !matches(expr, &folded) {
            return None;
        }
        Some(occurrence_score(expr, &folded, true))
    }
}

fn matches(expr: &Expr, folded: &str) -> bool {
    match expr {
        Expr::Term(needle) | Expr::Phrase(needle) => folded.contains(needle.as_str()),
        Expr::And(lhs, rhs) => matches(lhs, folded) && matches(rhs, folded),
        Expr::Or(lhs, rhs) => matches(lhs, folded) || matches(rhs, folded),
        Expr::Not(inner) => !matches(inner, folded),
    }
}

/// Sum occurrence counts over the positive leaves; leaves under an odd number
/// of negations contribute nothing.
fn occurrence_score(expr: &Expr, folded: &str, positive: bool) -> usize {
    match expr {
        Expr::Term(needle) | Expr::Phrase(needle) => {
            if positive {
                folded.matches(needle.as_str()).count()
            } else {
                0
            }
        }
        Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
            occurrence_score(lhs, folded, positive) + occurrence_score(rhs, folded, positive)
        }
        Expr::Not(inner) => occurrence_score(inner, folded, !positive),
    }
}
