// src/parser/shader_grammar.rs
// The fixed, curated grammar of the kernel dialect (a GLSL ES subset plus directives).

use super::grammar::{Grammar, GrammarSymbol, NonTerminal};
use crate::lexer::TokenKind;

macro_rules! sym {
    (($nt:ident)) => {
        GrammarSymbol::NonTerminal(NonTerminal::$nt)
    };
    ($t:ident) => {
        GrammarSymbol::Terminal(TokenKind::$t)
    };
}

// `Goal => [Terminal, (NonTerminal), ...];`
macro_rules! rules {
    ($($goal:ident => [$($s:tt),*];)*) => {
        vec![$((NonTerminal::$goal, vec![$(sym!($s)),*]),)*]
    };
}

const BUILTIN_TYPE_KEYWORDS: &[TokenKind] = &[
    TokenKind::Void,
    TokenKind::Bool,
    TokenKind::Int,
    TokenKind::Uint,
    TokenKind::Float,
    TokenKind::Vec2,
    TokenKind::Vec3,
    TokenKind::Vec4,
    TokenKind::Ivec2,
    TokenKind::Ivec3,
    TokenKind::Ivec4,
    TokenKind::Uvec2,
    TokenKind::Uvec3,
    TokenKind::Uvec4,
    TokenKind::Bvec2,
    TokenKind::Bvec3,
    TokenKind::Bvec4,
    TokenKind::Mat2,
    TokenKind::Mat3,
    TokenKind::Mat4,
    TokenKind::Sampler2D,
    TokenKind::Sampler3D,
    TokenKind::SamplerCube,
    TokenKind::Sampler2DShadow,
    TokenKind::SamplerCubeShadow,
    TokenKind::Sampler2DArray,
    TokenKind::Sampler2DArrayShadow,
    TokenKind::Isampler2D,
    TokenKind::Isampler3D,
    TokenKind::IsamplerCube,
    TokenKind::Isampler2DArray,
    TokenKind::Usampler2D,
    TokenKind::Usampler3D,
    TokenKind::UsamplerCube,
    TokenKind::Usampler2DArray,
];

const MACRO_KINDS: &[TokenKind] = &[
    TokenKind::MacroIf,
    TokenKind::MacroIfdef,
    TokenKind::MacroIfndef,
    TokenKind::MacroElif,
    TokenKind::MacroElse,
    TokenKind::MacroEndif,
    TokenKind::MacroDefine,
    TokenKind::MacroUndef,
    TokenKind::MacroOther,
];

fn one_of(goal: NonTerminal, kinds: &[TokenKind]) -> Vec<(NonTerminal, Vec<GrammarSymbol>)> {
    kinds
        .iter()
        .map(|&k| (goal, vec![GrammarSymbol::Terminal(k)]))
        .collect()
}

pub fn shader_grammar() -> Grammar {
    let mut r = rules! {
        Program => [(GlobalDeclarationList)];
        GlobalDeclarationList => [(GlobalDeclaration)];
        GlobalDeclarationList => [(GlobalDeclarationList), (GlobalDeclaration)];
        GlobalDeclaration => [(PrecisionSpecifier)];
        GlobalDeclaration => [(Declaration)];
        GlobalDeclaration => [(StructSpecifier)];
        GlobalDeclaration => [(FunctionDefinition)];
        GlobalDeclaration => [(FunctionPrototype), Semicolon];
        GlobalDeclaration => [(MacroDirective)];

        PrecisionSpecifier => [Precision, (PrecisionQualifier), (ExtBuiltinTypeSpecifierNonarray), Semicolon];

        StructSpecifier => [Struct, Ident, LeftBrace, (StructDeclarationList), RightBrace, Semicolon];
        StructDeclarationList => [(StructDeclaration)];
        StructDeclarationList => [(StructDeclarationList), (StructDeclaration)];
        StructDeclaration => [(TypeSpecifier), (StructDeclaratorList), Semicolon];
        StructDeclaration => [(TypeQualifier), (TypeSpecifier), (StructDeclaratorList), Semicolon];
        StructDeclaration => [(MacroDirective)];
        StructDeclaratorList => [(StructDeclarator)];
        StructDeclaratorList => [(StructDeclaratorList), Comma, (StructDeclarator)];
        StructDeclarator => [Ident];
        StructDeclarator => [Ident, (ArraySpecifier)];

        ArraySpecifier => [LeftBracket, RightBracket];
        ArraySpecifier => [LeftBracket, (IntegerConstantExpression), RightBracket];
        IntegerConstantExpression => [(VariableIdentifier)];
        IntegerConstantExpression => [IntConstant];
        IntegerConstantExpression => [(IntegerConstantExpression), (IntegerConstantExpressionOperator), IntConstant];
        IntegerConstantExpression => [(IntegerConstantExpression), (IntegerConstantExpressionOperator), (VariableIdentifier)];
        IntegerConstantExpressionOperator => [Plus];
        IntegerConstantExpressionOperator => [Dash];
        IntegerConstantExpressionOperator => [Star];
        IntegerConstantExpressionOperator => [Slash];
        IntegerConstantExpressionOperator => [Percent];

        TypeSpecifierNonarray => [(ExtBuiltinTypeSpecifierNonarray)];
        TypeSpecifierNonarray => [Ident];
        TypeSpecifier => [(TypeSpecifierNonarray)];
        TypeSpecifier => [(ExtBuiltinTypeSpecifierNonarray), (ArraySpecifier)];

        TypeQualifier => [(SingleTypeQualifier)];
        TypeQualifier => [(TypeQualifier), (SingleTypeQualifier)];
        SingleTypeQualifier => [(StorageQualifier)];
        SingleTypeQualifier => [(PrecisionQualifier)];
        SingleTypeQualifier => [(InterpolationQualifier)];
        SingleTypeQualifier => [(InvariantQualifier)];
        StorageQualifier => [Const];
        StorageQualifier => [In];
        StorageQualifier => [Out];
        StorageQualifier => [Inout];
        StorageQualifier => [Centroid];
        StorageQualifier => [Uniform];
        PrecisionQualifier => [Highp];
        PrecisionQualifier => [Mediump];
        PrecisionQualifier => [Lowp];
        InterpolationQualifier => [Smooth];
        InterpolationQualifier => [Flat];
        InvariantQualifier => [Invariant];
        FullySpecifiedType => [(TypeSpecifier)];
        FullySpecifiedType => [(TypeQualifier), (TypeSpecifier)];

        FunctionPrototype => [(FunctionDeclarator), RightParen];
        FunctionDeclarator => [(FunctionHeader)];
        FunctionDeclarator => [(FunctionHeaderWithParameters)];
        FunctionHeaderWithParameters => [(FunctionHeader), (ParameterDeclaration)];
        FunctionHeaderWithParameters => [(FunctionHeaderWithParameters), Comma, (ParameterDeclaration)];
        FunctionHeader => [(FullySpecifiedType), Ident, LeftParen];
        ParameterDeclarator => [(TypeSpecifier), Ident];
        ParameterDeclarator => [(TypeSpecifier), Ident, (ArraySpecifier)];
        ParameterDeclaration => [(TypeQualifier), (ParameterDeclarator)];
        ParameterDeclaration => [(ParameterDeclarator)];
        ParameterDeclaration => [(TypeQualifier), (ParameterTypeSpecifier)];
        ParameterDeclaration => [(ParameterTypeSpecifier)];
        ParameterTypeSpecifier => [(TypeSpecifier)];
        FunctionDefinition => [(FunctionPrototype), (CompoundStatementNoScope)];

        Declaration => [(InitDeclaratorList), Semicolon];
        InitDeclaratorList => [(SingleDeclaration)];
        InitDeclaratorList => [(InitDeclaratorList), Comma, Ident];
        InitDeclaratorList => [(InitDeclaratorList), Comma, Ident, (ArraySpecifier)];
        InitDeclaratorList => [(InitDeclaratorList), Comma, Ident, Equal, (Initializer)];
        InitDeclaratorList => [(InitDeclaratorList), Comma, Ident, (ArraySpecifier), Equal, (Initializer)];
        SingleDeclaration => [(FullySpecifiedType), Ident];
        SingleDeclaration => [(FullySpecifiedType), Ident, (ArraySpecifier)];
        SingleDeclaration => [(FullySpecifiedType), Ident, Equal, (Initializer)];
        SingleDeclaration => [(FullySpecifiedType), Ident, (ArraySpecifier), Equal, (Initializer)];
        Initializer => [(AssignmentExpression)];

        VariableIdentifier => [Ident];
        PrimaryExpression => [(VariableIdentifier)];
        PrimaryExpression => [IntConstant];
        PrimaryExpression => [UintConstant];
        PrimaryExpression => [FloatConstant];
        PrimaryExpression => [True];
        PrimaryExpression => [False];
        PrimaryExpression => [LeftParen, (Expression), RightParen];
        PostfixExpression => [(PrimaryExpression)];
        PostfixExpression => [(PostfixExpression), LeftBracket, (IntegerExpression), RightBracket];
        PostfixExpression => [(FunctionCall)];
        PostfixExpression => [(PostfixExpression), Dot, Ident];
        PostfixExpression => [(PostfixExpression), IncOp];
        PostfixExpression => [(PostfixExpression), DecOp];
        IntegerExpression => [(Expression)];
        FunctionCall => [(FunctionCallGeneric)];
        FunctionCallGeneric => [(FunctionIdentifier), LeftParen, (FunctionCallParameterList), RightParen];
        FunctionCallGeneric => [(FunctionIdentifier), LeftParen, RightParen];
        FunctionCallParameterList => [(AssignmentExpression)];
        FunctionCallParameterList => [(FunctionCallParameterList), Comma, (AssignmentExpression)];
        FunctionIdentifier => [(TypeSpecifier)];

        UnaryExpression => [(PostfixExpression)];
        UnaryExpression => [IncOp, (UnaryExpression)];
        UnaryExpression => [DecOp, (UnaryExpression)];
        UnaryExpression => [(UnaryOperator), (UnaryExpression)];
        UnaryOperator => [Plus];
        UnaryOperator => [Dash];
        UnaryOperator => [Bang];
        UnaryOperator => [Tilde];

        MultiplicativeExpression => [(UnaryExpression)];
        MultiplicativeExpression => [(MultiplicativeExpression), Star, (UnaryExpression)];
        MultiplicativeExpression => [(MultiplicativeExpression), Slash, (UnaryExpression)];
        MultiplicativeExpression => [(MultiplicativeExpression), Percent, (UnaryExpression)];
        AdditiveExpression => [(MultiplicativeExpression)];
        AdditiveExpression => [(AdditiveExpression), Plus, (MultiplicativeExpression)];
        AdditiveExpression => [(AdditiveExpression), Dash, (MultiplicativeExpression)];
        ShiftExpression => [(AdditiveExpression)];
        ShiftExpression => [(ShiftExpression), LeftOp, (AdditiveExpression)];
        ShiftExpression => [(ShiftExpression), RightOp, (AdditiveExpression)];
        RelationalExpression => [(ShiftExpression)];
        RelationalExpression => [(RelationalExpression), LeftAngle, (ShiftExpression)];
        RelationalExpression => [(RelationalExpression), RightAngle, (ShiftExpression)];
        RelationalExpression => [(RelationalExpression), LeOp, (ShiftExpression)];
        RelationalExpression => [(RelationalExpression), GeOp, (ShiftExpression)];
        EqualityExpression => [(RelationalExpression)];
        EqualityExpression => [(EqualityExpression), EqOp, (RelationalExpression)];
        EqualityExpression => [(EqualityExpression), NeOp, (RelationalExpression)];
        AndExpression => [(EqualityExpression)];
        AndExpression => [(AndExpression), Ampersand, (EqualityExpression)];
        ExclusiveOrExpression => [(AndExpression)];
        ExclusiveOrExpression => [(ExclusiveOrExpression), Caret, (AndExpression)];
        InclusiveOrExpression => [(ExclusiveOrExpression)];
        InclusiveOrExpression => [(InclusiveOrExpression), VerticalBar, (ExclusiveOrExpression)];
        LogicalAndExpression => [(InclusiveOrExpression)];
        LogicalAndExpression => [(LogicalAndExpression), AndOp, (InclusiveOrExpression)];
        LogicalXorExpression => [(LogicalAndExpression)];
        LogicalXorExpression => [(LogicalXorExpression), XorOp, (LogicalAndExpression)];
        LogicalOrExpression => [(LogicalXorExpression)];
        LogicalOrExpression => [(LogicalOrExpression), OrOp, (LogicalXorExpression)];
        ConditionalExpression => [(LogicalOrExpression)];
        ConditionalExpression => [(LogicalOrExpression), Question, (Expression), Colon, (AssignmentExpression)];
        AssignmentExpression => [(ConditionalExpression)];
        AssignmentExpression => [(UnaryExpression), (AssignmentOperator), (AssignmentExpression)];
        AssignmentOperator => [Equal];
        AssignmentOperator => [MulAssign];
        AssignmentOperator => [DivAssign];
        AssignmentOperator => [ModAssign];
        AssignmentOperator => [AddAssign];
        AssignmentOperator => [SubAssign];
        AssignmentOperator => [LeftAssign];
        AssignmentOperator => [RightAssign];
        AssignmentOperator => [AndAssign];
        AssignmentOperator => [XorAssign];
        AssignmentOperator => [OrAssign];
        Expression => [(AssignmentExpression)];
        Expression => [(Expression), Comma, (AssignmentExpression)];

        Statement => [(CompoundStatement)];
        Statement => [(SimpleStatement)];
        SimpleStatement => [(DeclarationStatement)];
        SimpleStatement => [(ExpressionStatement)];
        SimpleStatement => [(SelectionStatement)];
        SimpleStatement => [(IterationStatement)];
        SimpleStatement => [(JumpStatement)];
        SimpleStatement => [(MacroDirective)];
        CompoundStatement => [LeftBrace, RightBrace];
        CompoundStatement => [(ScopeBrace), (StatementList), (ScopeEndBrace)];
        ScopeBrace => [LeftBrace];
        ScopeEndBrace => [RightBrace];
        CompoundStatementNoScope => [LeftBrace, RightBrace];
        CompoundStatementNoScope => [LeftBrace, (StatementList), RightBrace];
        StatementList => [(Statement)];
        StatementList => [(StatementList), (Statement)];
        DeclarationStatement => [(Declaration)];
        ExpressionStatement => [Semicolon];
        ExpressionStatement => [(Expression), Semicolon];
        SelectionStatement => [If, LeftParen, (Expression), RightParen, (Statement)];
        SelectionStatement => [If, LeftParen, (Expression), RightParen, (Statement), Else, (Statement)];
        IterationStatement => [While, LeftParen, (Expression), RightParen, (Statement)];
        IterationStatement => [Do, (Statement), While, LeftParen, (Expression), RightParen, Semicolon];
        IterationStatement => [(ForScopeStart), (ForInitStatement), (ForRestStatement), RightParen, (Statement)];
        ForScopeStart => [For, LeftParen];
        ForInitStatement => [(ExpressionStatement)];
        ForInitStatement => [(DeclarationStatement)];
        ForRestStatement => [Semicolon];
        ForRestStatement => [(Expression), Semicolon];
        ForRestStatement => [Semicolon, (Expression)];
        ForRestStatement => [(Expression), Semicolon, (Expression)];
        JumpStatement => [Continue, Semicolon];
        JumpStatement => [Break, Semicolon];
        JumpStatement => [Return, Semicolon];
        JumpStatement => [Return, (Expression), Semicolon];
        JumpStatement => [Discard, Semicolon];
    };
    r.extend(one_of(
        NonTerminal::ExtBuiltinTypeSpecifierNonarray,
        BUILTIN_TYPE_KEYWORDS,
    ));
    r.extend(one_of(NonTerminal::MacroDirective, MACRO_KINDS));

    Grammar::new(NonTerminal::Program, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_nonterminal_has_productions() {
        let g = shader_grammar();
        for &nt in NonTerminal::ALL {
            assert!(
                !g.productions_of(nt).is_empty(),
                "{} has no productions",
                nt.name()
            );
        }
    }

    #[test]
    fn builtin_type_list_matches_token_ranges() {
        for k in TokenKind::ALL {
            assert_eq!(k.is_builtin_type(), BUILTIN_TYPE_KEYWORDS.contains(k));
            assert_eq!(k.is_macro(), MACRO_KINDS.contains(k));
        }
    }
}
