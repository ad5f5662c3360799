/// Lexical token kinds produced by the lexer.
///
/// The lexer itself is ambient scaffolding around the core pipeline (module
/// graph construction, AST/symbol model, codegen, struct/field engine) — its
/// job is just to turn source bytes into a flat token stream for the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    IntLit,
    FloatLit,
    StringLit,
    CharLit,
    Identifier,

    // Keywords
    KwConst,
    KwLet,
    KwFn,
    KwStruct,
    KwEnum,
    KwPub,
    KwPriv,
    KwReturn,
    KwIf,
    KwElse,
    KwWhile,
    KwFor,
    KwTrue,
    KwFalse,
    KwNull,
    KwCast,
    KwSizeOf,
    KwAlloc,
    KwFree,
    KwInput,
    KwSystem,
    KwSyscall,
    KwModule,
    KwUse,
    KwAs,
    KwMut,
    KwBreak,
    KwContinue,

    // Punctuation / operators
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    ColonColon,
    Arrow,
    Dot,
    DotDot,
    Amp,
    Star,
    Plus,
    Minus,
    Slash,
    Percent,
    Bang,
    Tilde,
    Pipe,
    Caret,
    Shl,
    Shr,
    PlusPlus,
    MinusMinus,
    AmpAmp,
    PipePipe,
    Eq,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Hash,
    At,

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }
}
