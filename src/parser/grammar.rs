// src/parser/grammar.rs
// Grammar symbols, productions and the grammar container consumed by the LALR builder.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::lexer::TokenKind;

macro_rules! nonterminals {
    ($($name:ident => $text:literal,)*) => {
        /// Nonterminals of the shader grammar. Each one maps 1:1 onto an AST node kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(u16)]
        pub enum NonTerminal {
            $($name,)*
        }

        impl NonTerminal {
            pub const ALL: &'static [NonTerminal] = &[$(NonTerminal::$name,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(NonTerminal::$name => $text,)*
                }
            }
        }
    };
}

nonterminals! {
    Start => "start",
    Program => "program",
    GlobalDeclarationList => "global_declaration_list",
    GlobalDeclaration => "global_declaration",
    PrecisionSpecifier => "precision_specifier",
    StructSpecifier => "struct_specifier",
    StructDeclarationList => "struct_declaration_list",
    StructDeclaration => "struct_declaration",
    StructDeclaratorList => "struct_declarator_list",
    StructDeclarator => "struct_declarator",
    ArraySpecifier => "array_specifier",
    IntegerConstantExpression => "integer_constant_expression",
    IntegerConstantExpressionOperator => "integer_constant_expression_operator",
    ExtBuiltinTypeSpecifierNonarray => "ext_builtin_type_specifier_nonarray",
    TypeSpecifierNonarray => "type_specifier_nonarray",
    TypeSpecifier => "type_specifier",
    TypeQualifier => "type_qualifier",
    SingleTypeQualifier => "single_type_qualifier",
    StorageQualifier => "storage_qualifier",
    PrecisionQualifier => "precision_qualifier",
    InterpolationQualifier => "interpolation_qualifier",
    InvariantQualifier => "invariant_qualifier",
    FullySpecifiedType => "fully_specified_type",
    FunctionPrototype => "function_prototype",
    FunctionDeclarator => "function_declarator",
    FunctionHeaderWithParameters => "function_header_with_parameters",
    FunctionHeader => "function_header",
    ParameterDeclarator => "parameter_declarator",
    ParameterDeclaration => "parameter_declaration",
    ParameterTypeSpecifier => "parameter_type_specifier",
    FunctionDefinition => "function_definition",
    Declaration => "declaration",
    InitDeclaratorList => "init_declarator_list",
    SingleDeclaration => "single_declaration",
    Initializer => "initializer",
    VariableIdentifier => "variable_identifier",
    PrimaryExpression => "primary_expression",
    PostfixExpression => "postfix_expression",
    IntegerExpression => "integer_expression",
    FunctionCall => "function_call",
    FunctionCallGeneric => "function_call_generic",
    FunctionCallParameterList => "function_call_parameter_list",
    FunctionIdentifier => "function_identifier",
    UnaryExpression => "unary_expression",
    UnaryOperator => "unary_operator",
    MultiplicativeExpression => "multiplicative_expression",
    AdditiveExpression => "additive_expression",
    ShiftExpression => "shift_expression",
    RelationalExpression => "relational_expression",
    EqualityExpression => "equality_expression",
    AndExpression => "and_expression",
    ExclusiveOrExpression => "exclusive_or_expression",
    InclusiveOrExpression => "inclusive_or_expression",
    LogicalAndExpression => "logical_and_expression",
    LogicalXorExpression => "logical_xor_expression",
    LogicalOrExpression => "logical_or_expression",
    ConditionalExpression => "conditional_expression",
    AssignmentExpression => "assignment_expression",
    AssignmentOperator => "assignment_operator",
    Expression => "expression",
    Statement => "statement",
    SimpleStatement => "simple_statement",
    CompoundStatement => "compound_statement",
    CompoundStatementNoScope => "compound_statement_no_scope",
    ScopeBrace => "scope_brace",
    ScopeEndBrace => "scope_end_brace",
    StatementList => "statement_list",
    DeclarationStatement => "declaration_statement",
    ExpressionStatement => "expression_statement",
    SelectionStatement => "selection_statement",
    IterationStatement => "iteration_statement",
    ForScopeStart => "for_scope_start",
    ForInitStatement => "for_init_statement",
    ForRestStatement => "for_rest_statement",
    JumpStatement => "jump_statement",
    MacroDirective => "macro_directive",
}

pub const N_NONTERMINALS: usize = NonTerminal::ALL.len();

impl NonTerminal {
    #[inline]
    pub fn idx(self) -> usize {
        self as usize
    }
}

/// Terminal or nonterminal. The derived ordering puts every terminal before every
/// nonterminal, so `is_terminal` is a single comparison against the first nonterminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GrammarSymbol {
    Terminal(TokenKind),
    NonTerminal(NonTerminal),
}

impl GrammarSymbol {
    #[inline]
    pub fn is_terminal(self) -> bool {
        self < GrammarSymbol::NonTerminal(NonTerminal::Start)
    }
}

impl fmt::Display for GrammarSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarSymbol::Terminal(t) => write!(f, "'{}'", t.text()),
            GrammarSymbol::NonTerminal(n) => write!(f, "{}", n.name()),
        }
    }
}

pub type ProductionId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub id: ProductionId,
    pub goal: NonTerminal,
    pub derivation: Vec<GrammarSymbol>,
}

impl Production {
    pub fn is_epsilon(&self) -> bool {
        self.derivation.is_empty()
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.goal.name())?;
        if self.derivation.is_empty() {
            return write!(f, " ε");
        }
        for s in &self.derivation {
            write!(f, " {s}")?;
        }
        Ok(())
    }
}

/// Immutable production pool plus a goal index. Production 0 is always the
/// augmented `start -> <start symbol>` rule.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub start: NonTerminal,
    productions: Vec<Production>,
    by_goal: Vec<Vec<ProductionId>>,
}

impl Grammar {
    pub fn new(start: NonTerminal, rules: Vec<(NonTerminal, Vec<GrammarSymbol>)>) -> Self {
        let mut productions = Vec::with_capacity(rules.len() + 1);
        productions.push(Production {
            id: 0,
            goal: NonTerminal::Start,
            derivation: vec![GrammarSymbol::NonTerminal(start)],
        });
        for (goal, derivation) in rules {
            let id = productions.len();
            productions.push(Production {
                id,
                goal,
                derivation,
            });
        }

        let mut by_goal = vec![Vec::new(); N_NONTERMINALS];
        for p in &productions {
            by_goal[p.goal.idx()].push(p.id);
        }

        Self {
            start,
            productions,
            by_goal,
        }
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id]
    }

    pub fn productions_of(&self, goal: NonTerminal) -> &[ProductionId] {
        &self.by_goal[goal.idx()]
    }

    /// Nonterminals that have at least one production, in declaration order.
    pub fn nonterminals(&self) -> impl Iterator<Item = NonTerminal> + '_ {
        NonTerminal::ALL
            .iter()
            .copied()
            .filter(|n| !self.by_goal[n.idx()].is_empty())
    }

    /// BNF rendering (one alternative list per nonterminal), used by the table tool.
    pub fn to_bnf(&self) -> String {
        let mut out = String::new();
        for nt in self.nonterminals() {
            let _ = write!(out, "<{}> ::=", nt.name());
            for (i, &pid) in self.productions_of(nt).iter().enumerate() {
                if i > 0 {
                    out.push_str(" |");
                }
                let p = &self.productions[pid];
                if p.derivation.is_empty() {
                    out.push_str(" \"\"");
                }
                for s in &p.derivation {
                    match s {
                        GrammarSymbol::Terminal(t) => {
                            let _ = write!(out, " \"{}\"", t.text());
                        }
                        GrammarSymbol::NonTerminal(n) => {
                            let _ = write!(out, " <{}>", n.name());
                        }
                    }
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminals_order_before_nonterminals() {
        let last_terminal = *TokenKind::ALL.last().unwrap();
        assert!(GrammarSymbol::Terminal(last_terminal).is_terminal());
        assert!(GrammarSymbol::Terminal(TokenKind::Eof).is_terminal());
        assert!(!GrammarSymbol::NonTerminal(NonTerminal::Start).is_terminal());
        assert!(!GrammarSymbol::NonTerminal(NonTerminal::MacroDirective).is_terminal());
    }

    #[test]
    fn augmented_production_is_first() {
        let g = Grammar::new(
            NonTerminal::Expression,
            vec![(
                NonTerminal::Expression,
                vec![GrammarSymbol::Terminal(TokenKind::Ident)],
            )],
        );
        assert_eq!(g.production(0).goal, NonTerminal::Start);
        assert_eq!(g.productions_of(NonTerminal::Expression), &[1]);
        assert!(g.to_bnf().contains("<expression> ::= \"IDENTIFIER\""));
    }
}
