//! The grammar of the filter language.
//!
//! Precedence from lowest to highest: `or`, `and`, bracketed expressions and
//! comparisons. Both connectives are left-associative, so `a or b and c` reads
//! as `a or (b and c)`. Every production can be chosen from a single token of
//! lookahead, which is what [`crate::parser::Parser`] relies on.

/// The production rules, in EBNF.
pub const GRAMMAR: &str = r#"start        := expr EOI
expr         := or_expr
or_expr      := and_expr ( "or" and_expr )*
and_expr     := operand ( "and" operand )*
operand      := comparison | bracket_expr
bracket_expr := "(" expr ")"
comparison   := IDENT OP STRING

IDENT        := [A-Za-z_] [A-Za-z0-9_]*
OP           := "=" | "!=" | "=~" | "!~"
STRING       := '"' ( [^"\\] | '\"' | '\\' )* '"'
"#;
