use super::{ast::*, error::*, lexer::*};
use crate::common::*;
use tracing::{debug, trace};

const DICE: &str = "d";
const FATE_DICE: &str = "dF";

/// A parsed tree together with every diagnostic recorded while building it.
///
/// The tree is always complete: operands that could not be parsed are
/// replaced by `Integer 0` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub root: Node,
    pub errors: Vec<ParseError>,
}

impl Parsed {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ModifierSpec {
    Keep(&'static str),
    Drop(&'static str),
    Reroll { once: bool },
    Critical(&'static str),
    Sort(&'static str),
}

impl ModifierSpec {
    fn from_ident(s: &str) -> Option<Self> {
        use ModifierSpec::*;
        Some(match s {
            "k" | "kh" => Keep("highest"),
            "kl" => Keep("lowest"),
            "dh" => Drop("highest"),
            "dl" => Drop("lowest"),
            "r" => Reroll { once: false },
            "ro" => Reroll { once: true },
            "cs" => Critical("success"),
            "cf" => Critical("failure"),
            "s" | "sa" => Sort("ascending"),
            "sd" => Sort("descending"),
            _ => return None,
        })
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    // Tokens that close an enclosing construct; error recovery leaves them in place.
    const CLOSERS: &'static [TokenKind] = &[
        TokenKind::EndOfInput,
        TokenKind::ParenthesisClose,
        TokenKind::BraceClose,
        TokenKind::Comma,
    ];

    pub fn new(s: &'a str) -> Self {
        Self {
            lexer: Lexer::new(s),
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Parsed {
        let root = self.parse_expression();
        if !self.matches(TokenKind::EndOfInput) {
            self.unexpected_token(vec1![TokenKind::EndOfInput]);
        }
        debug!(errors = self.errors.len(), "parsed dice expression");
        Parsed {
            root,
            errors: self.errors,
        }
    }

    fn peek(&mut self) -> &Token<'a> {
        self.lexer.peek_token()
    }

    fn advance(&mut self) -> Token<'a> {
        self.lexer.next_token()
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        self.peek().is(kind)
    }

    fn matches_any(&mut self, options: &[TokenKind]) -> bool {
        self.peek().is_any(options)
    }

    fn error(&mut self, token: &Token<'_>, kind: ParseErrorKind) {
        let error = ParseError::at(token, kind);
        trace!(%error, "recorded parse error");
        self.errors.push(error);
    }

    /// Records an error against the next token without consuming it.
    fn unexpected_token(&mut self, expected: NonEmpty<TokenKind>) {
        let token = self.peek().clone();
        let kind = if token.is(TokenKind::Unknown) {
            ParseErrorKind::UnknownInput
        } else {
            ParseErrorKind::UnexpectedToken {
                found: token.kind,
                expected,
            }
        };
        self.error(&token, kind);
    }

    fn consume(&mut self, expected: TokenKind) -> bool {
        if self.matches(expected) {
            self.advance();
            true
        } else {
            self.unexpected_token(vec1![expected]);
            false
        }
    }

    fn integer(&mut self, token: &Token<'_>) -> Int {
        match token.slice.parse() {
            Ok(x) => x,
            Err(_) => {
                self.error(token, ParseErrorKind::IntegerTooLarge);
                0
            }
        }
    }

    fn peek_compare_op(&mut self) -> Option<CompareOp> {
        Some(match self.peek().kind {
            TokenKind::Equals => CompareOp::Equal,
            TokenKind::Greater => CompareOp::Greater,
            TokenKind::GreaterOrEqual => CompareOp::GreaterOrEqual,
            TokenKind::Less => CompareOp::Less,
            TokenKind::LessOrEqual => CompareOp::LessOrEqual,
            _ => return None,
        })
    }

    fn parse_expression(&mut self) -> Node {
        let lhs = self.parse_simple();

        match self.peek_compare_op() {
            Some(op) => {
                self.advance();
                let rhs = self.parse_simple();
                Node::binary(NodeKind::from_compare_op(op), lhs, rhs)
            }
            None => lhs,
        }
    }

    fn parse_simple(&mut self) -> Node {
        let mut lhs = if self.matches(TokenKind::Minus) {
            self.advance();
            Node::unary(NodeKind::Negate, self.parse_term())
        } else {
            if self.matches(TokenKind::Plus) {
                self.advance();
            }
            self.parse_term()
        };

        while self.matches_any(TokenKind::ADDITION_OPS) {
            let kind = match self.advance().kind {
                TokenKind::Plus => NodeKind::Add,
                _ => NodeKind::Subtract,
            };
            let rhs = self.parse_term();

            lhs = Node::binary(kind, lhs, rhs);
        }

        lhs
    }

    fn parse_term(&mut self) -> Node {
        let mut lhs = self.parse_power();

        while self.matches_any(TokenKind::MULTIPLICATION_OPS) {
            let kind = match self.advance().kind {
                TokenKind::Asterisk => NodeKind::Multiply,
                TokenKind::Slash => NodeKind::Divide,
                _ => NodeKind::Modulo,
            };
            let rhs = self.parse_power();

            lhs = Node::binary(kind, lhs, rhs);
        }

        lhs
    }

    fn parse_power(&mut self) -> Node {
        let lhs = self.parse_factor();

        if self.matches(TokenKind::DoubleAsterisk) {
            self.advance();
            let rhs = if self.matches(TokenKind::Minus) {
                self.advance();
                Node::unary(NodeKind::Negate, self.parse_power())
            } else {
                self.parse_power()
            };
            Node::binary(NodeKind::Exponent, lhs, rhs)
        } else {
            lhs
        }
    }

    fn parse_factor(&mut self) -> Node {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Identifier if token.slice == DICE || token.slice == FATE_DICE => {
                self.parse_dice(Node::integer(1))
            }
            TokenKind::Identifier => self.parse_function_call(),
            TokenKind::ParenthesisOpen => {
                self.advance();
                let inner = self.parse_expression();
                self.consume(TokenKind::ParenthesisClose);
                self.parse_dice_tail(inner)
            }
            TokenKind::BraceOpen => self.parse_group(),
            TokenKind::Integer => {
                self.advance();
                let count = Node::integer(self.integer(&token));
                self.parse_dice_tail(count)
            }
            _ => {
                self.unexpected_token(vec1![
                    TokenKind::Integer,
                    TokenKind::Identifier,
                    TokenKind::ParenthesisOpen,
                    TokenKind::BraceOpen
                ]);
                if !token.is_any(Self::CLOSERS) {
                    self.advance();
                }
                Node::integer(0)
            }
        }
    }

    fn parse_function_call(&mut self) -> Node {
        let name = self.advance();
        let mut args = Vec::new();

        if self.consume(TokenKind::ParenthesisOpen) {
            if !self.matches(TokenKind::ParenthesisClose) {
                args.push(self.parse_expression());
                while self.matches(TokenKind::Comma) {
                    self.advance();
                    args.push(self.parse_expression());
                }
            }
            self.consume(TokenKind::ParenthesisClose);
        }

        Node::function(name.slice, args)
    }

    fn parse_group(&mut self) -> Node {
        self.consume(TokenKind::BraceOpen);

        let mut items = vec![self.parse_expression()];
        while self.matches(TokenKind::Comma) {
            self.advance();
            items.push(self.parse_expression());
        }
        self.consume(TokenKind::BraceClose);

        let mut group = Node::with_children(NodeKind::Group, items);
        if self.matches(TokenKind::Ellipsis) {
            self.advance();
            let token = self.peek().clone();
            if token.is(TokenKind::Integer) {
                self.advance();
                let times = self.integer(&token);
                group.set_attr(attr::REPEAT, times);
            } else {
                self.unexpected_token(vec1![TokenKind::Integer]);
            }
        }

        self.parse_modifiers(group)
    }

    /// A roll count followed by an identifier is a dice roll.
    fn parse_dice_tail(&mut self, count: Node) -> Node {
        if self.matches(TokenKind::Identifier) {
            self.parse_dice(count)
        } else {
            count
        }
    }

    fn parse_dice(&mut self, count: Node) -> Node {
        let token = self.advance();
        let sides = match token.slice {
            DICE => self.parse_sides(),
            FATE_DICE => Sides::Fate,
            other => {
                self.error(&token, ParseErrorKind::InvalidDice(other.to_owned()));
                return count;
            }
        };

        self.parse_modifiers(Node::dice(count, sides))
    }

    fn parse_sides(&mut self) -> Sides {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Integer => {
                self.advance();
                Sides::Poly(self.integer(&token))
            }
            TokenKind::Percent => {
                self.advance();
                Sides::Poly(100)
            }
            _ => {
                self.unexpected_token(vec1![TokenKind::Integer, TokenKind::Percent]);
                Sides::Poly(0)
            }
        }
    }

    fn parse_modifiers(&mut self, mut target: Node) -> Node {
        loop {
            let token = self.peek().clone();
            let modifier = match token.kind {
                TokenKind::Exclamation => self.parse_explode(),
                TokenKind::Identifier => match ModifierSpec::from_ident(token.slice) {
                    Some(spec) => {
                        self.advance();
                        self.parse_modifier(spec)
                    }
                    None => {
                        self.advance();
                        self.error(&token, ParseErrorKind::InvalidModifier(token.slice.to_owned()));
                        continue;
                    }
                },
                _ => return target,
            };

            if target.leftmost_dice().is_none() {
                self.error(&token, ParseErrorKind::ModifierWithoutDice);
                continue;
            }

            let (mut node, arg) = modifier;
            node.children.push(target);
            node.children.extend(arg);
            target = node;
        }
    }

    /// Builds a modifier node without its target, plus its optional argument.
    fn parse_modifier(&mut self, spec: ModifierSpec) -> (Node, Option<Node>) {
        match spec {
            ModifierSpec::Keep(which) | ModifierSpec::Drop(which) => {
                let kind = match spec {
                    ModifierSpec::Keep(_) => NodeKind::Keep,
                    _ => NodeKind::Drop,
                };
                let mut node = Node::new(kind);
                node.set_attr(attr::TYPE, which);
                let count = self.parse_optional_integer();
                (node, count)
            }
            ModifierSpec::Reroll { once } => {
                let mut node = Node::new(NodeKind::Reroll);
                node.set_attr(attr::ONCE, once);
                (node, self.parse_condition())
            }
            ModifierSpec::Critical(which) => {
                let mut node = Node::new(NodeKind::Critical);
                node.set_attr(attr::TYPE, which);
                (node, self.parse_condition())
            }
            ModifierSpec::Sort(direction) => {
                let mut node = Node::new(NodeKind::Sort);
                node.set_attr(attr::DIRECTION, direction);
                (node, None)
            }
        }
    }

    // `!`, `!!` (compound), `!p` (penetrate), `!!p`
    fn parse_explode(&mut self) -> (Node, Option<Node>) {
        self.advance();
        let compound = self.matches(TokenKind::Exclamation);
        if compound {
            self.advance();
        }
        let penetrate = self.peek().is_ident("p");
        if penetrate {
            self.advance();
        }

        let mut node = Node::new(NodeKind::Explode);
        node.set_attr(attr::COMPOUND, compound);
        node.set_attr(attr::PENETRATE, penetrate);
        (node, self.parse_condition())
    }

    fn parse_optional_integer(&mut self) -> Option<Node> {
        let token = self.peek().clone();
        if token.is(TokenKind::Integer) {
            self.advance();
            Some(Node::integer(self.integer(&token)))
        } else {
            None
        }
    }

    /// `compareOp [-]integer`, or a bare integer meaning equality.
    fn parse_condition(&mut self) -> Option<Node> {
        if let Some(op) = self.peek_compare_op() {
            self.advance();
            let value = self.parse_signed_integer();
            Some(Node::unary(NodeKind::from_compare_op(op), value))
        } else {
            let value = self.parse_optional_integer()?;
            Some(Node::unary(NodeKind::Equal, value))
        }
    }

    fn parse_signed_integer(&mut self) -> Node {
        let negative = self.matches(TokenKind::Minus);
        if negative {
            self.advance();
        }

        let token = self.peek().clone();
        if token.is(TokenKind::Integer) {
            self.advance();
            let x = self.integer(&token);
            Node::integer(if negative { -x } else { x })
        } else {
            self.unexpected_token(vec1![TokenKind::Integer]);
            Node::integer(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    macro_rules! dice {
        ($num:expr, $sides:expr) => {
            Node::dice(Node::integer($num), Sides::Poly($sides))
        };
    }

    fn int(x: Int) -> Node {
        Node::integer(x)
    }

    fn bin(kind: NodeKind, lhs: Node, rhs: Node) -> Node {
        Node::binary(kind, lhs, rhs)
    }

    fn modifier(kind: NodeKind, attrs: &[(&str, Attribute)], children: Vec<Node>) -> Node {
        let mut node = Node::with_children(kind, children);
        for (key, value) in attrs {
            node.set_attr(key, value.clone());
        }
        node
    }

    fn parse(s: &str) -> Parsed {
        Parser::new(s).parse()
    }

    fn check(s: &str, expected: Node) {
        let parsed = parse(s);
        assert_eq!(parsed.errors, vec![], "unexpected errors for {:?}", s);
        assert_eq!(parsed.root, expected);
    }

    fn check_err(s: &str, expected: ParseErrorKind) {
        let parsed = parse(s);
        assert!(
            parsed.errors.iter().any(|e| e.kind == expected),
            "{:?} not in {:?}",
            expected,
            parsed.errors
        );
    }

    #[test]
    fn test_parse_nums() {
        check("32", int(32));
        check("+32", int(32));
        check("-32", Node::unary(NodeKind::Negate, int(32)));
    }

    #[test]
    fn test_parse_dice() {
        check("1d20", dice!(1, 20));
        check("d4", dice!(1, 4));
        check("2d%", dice!(2, 100));
        check("4dF", Node::dice(int(4), Sides::Fate));
        check("dF", Node::dice(int(1), Sides::Fate));
    }

    #[test]
    fn test_parse_computed_roll_count() {
        check(
            "(2/5)d6",
            Node::dice(bin(NodeKind::Divide, int(2), int(5)), Sides::Poly(6)),
        );
        check(
            "(4d4)d20",
            Node::dice(dice!(4, 4), Sides::Poly(20)),
        );
    }

    #[test]
    fn test_parse_precedence() {
        check(
            "1 + 2 * 3",
            bin(NodeKind::Add, int(1), bin(NodeKind::Multiply, int(2), int(3))),
        );
        check(
            "2*3**2",
            bin(NodeKind::Multiply, int(2), bin(NodeKind::Exponent, int(3), int(2))),
        );
        check(
            "2**3**2",
            bin(NodeKind::Exponent, int(2), bin(NodeKind::Exponent, int(3), int(2))),
        );
        check(
            "10 - 2 - 3",
            bin(NodeKind::Subtract, bin(NodeKind::Subtract, int(10), int(2)), int(3)),
        );
        check(
            "-2 % 3",
            Node::unary(NodeKind::Negate, bin(NodeKind::Modulo, int(2), int(3))),
        );
    }

    #[test]
    fn test_parse_comparison() {
        check(
            "4d20kh3>=15",
            bin(
                NodeKind::GreaterOrEqual,
                modifier(
                    NodeKind::Keep,
                    &[(attr::TYPE, "highest".into())],
                    vec![dice!(4, 20), int(3)],
                ),
                int(15),
            ),
        );
        check("1 + 1 = 2", bin(NodeKind::Equal, bin(NodeKind::Add, int(1), int(1)), int(2)));
    }

    #[test]
    fn test_comparison_does_not_chain() {
        let parsed = parse("1 < 2 < 3");
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].span, 6..7);
    }

    #[test]
    fn test_parse_modifiers() {
        check(
            "2d20kl",
            modifier(NodeKind::Keep, &[(attr::TYPE, "lowest".into())], vec![dice!(2, 20)]),
        );
        check(
            "4d6dl1",
            modifier(
                NodeKind::Drop,
                &[(attr::TYPE, "lowest".into())],
                vec![dice!(4, 6), int(1)],
            ),
        );
        check(
            "4d6r<2kh3",
            modifier(
                NodeKind::Keep,
                &[(attr::TYPE, "highest".into())],
                vec![
                    modifier(
                        NodeKind::Reroll,
                        &[(attr::ONCE, false.into())],
                        vec![dice!(4, 6), Node::unary(NodeKind::Less, int(2))],
                    ),
                    int(3),
                ],
            ),
        );
        check(
            "1d20ro",
            modifier(NodeKind::Reroll, &[(attr::ONCE, true.into())], vec![dice!(1, 20)]),
        );
        check(
            "1d20cs>=19cf2",
            modifier(
                NodeKind::Critical,
                &[(attr::TYPE, "failure".into())],
                vec![
                    modifier(
                        NodeKind::Critical,
                        &[(attr::TYPE, "success".into())],
                        vec![dice!(1, 20), Node::unary(NodeKind::GreaterOrEqual, int(19))],
                    ),
                    Node::unary(NodeKind::Equal, int(2)),
                ],
            ),
        );
        check(
            "3d6sd",
            modifier(NodeKind::Sort, &[(attr::DIRECTION, "descending".into())], vec![dice!(3, 6)]),
        );
        check(
            "4dFr=-1",
            modifier(
                NodeKind::Reroll,
                &[(attr::ONCE, false.into())],
                vec![
                    Node::dice(int(4), Sides::Fate),
                    Node::unary(NodeKind::Equal, int(-1)),
                ],
            ),
        );
    }

    #[test]
    fn test_parse_explode() {
        let explode = |compound: bool, penetrate: bool, children: Vec<Node>| {
            modifier(
                NodeKind::Explode,
                &[
                    (attr::COMPOUND, compound.into()),
                    (attr::PENETRATE, penetrate.into()),
                ],
                children,
            )
        };
        check("3d6!", explode(false, false, vec![dice!(3, 6)]));
        check("3d6!!", explode(true, false, vec![dice!(3, 6)]));
        check(
            "3d6!p>4",
            explode(false, true, vec![dice!(3, 6), Node::unary(NodeKind::Greater, int(4))]),
        );
        check(
            "3d6!!p5",
            explode(true, true, vec![dice!(3, 6), Node::unary(NodeKind::Equal, int(5))]),
        );
    }

    #[test]
    fn test_parse_group() {
        check(
            "{2d20, 1d8}",
            Node::with_children(NodeKind::Group, vec![dice!(2, 20), dice!(1, 8)]),
        );

        let mut repeated = Node::with_children(
            NodeKind::Group,
            vec![modifier(NodeKind::Keep, &[(attr::TYPE, "lowest".into())], vec![dice!(2, 20)])],
        );
        repeated.set_attr(attr::REPEAT, 10 as Int);
        check("{2d20kl}...10", repeated);
    }

    #[test]
    fn test_parse_group_modifier() {
        check(
            "{3d6, 2}kh2",
            modifier(
                NodeKind::Keep,
                &[(attr::TYPE, "highest".into())],
                vec![
                    Node::with_children(NodeKind::Group, vec![dice!(3, 6), int(2)]),
                    int(2),
                ],
            ),
        );
        check_err("{1, 2}kh", ParseErrorKind::ModifierWithoutDice);
    }

    #[test]
    fn test_parse_function_call() {
        check("floor(7 / 2)", Node::function("floor", vec![bin(NodeKind::Divide, int(7), int(2))]));
        check("max(1d6, 3)", Node::function("max", vec![dice!(1, 6), int(3)]));
        check("roll()", Node::function("roll", vec![]));
    }

    #[test]
    fn test_errors_accumulate() {
        let parsed = parse("(1 + $) + floor(2");
        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.errors[0].kind, ParseErrorKind::UnknownInput);
        assert_eq!(parsed.errors[0].span, 5..6);
        assert_eq!(
            parsed.errors[1].kind,
            ParseErrorKind::UnexpectedToken {
                found: TokenKind::EndOfInput,
                expected: vec1![TokenKind::ParenthesisClose],
            }
        );
        assert_eq!(
            parsed.root,
            bin(
                NodeKind::Add,
                bin(NodeKind::Add, int(1), int(0)),
                Node::function("floor", vec![int(2)]),
            )
        );
    }

    #[test]
    fn test_parse_errors() {
        check_err("2x", ParseErrorKind::InvalidDice("x".to_owned()));
        check_err("2d6q", ParseErrorKind::InvalidModifier("q".to_owned()));
        check_err("99999999999999999999", ParseErrorKind::IntegerTooLarge);
        check_err(
            "2d",
            ParseErrorKind::UnexpectedToken {
                found: TokenKind::EndOfInput,
                expected: vec1![TokenKind::Integer, TokenKind::Percent],
            },
        );
        check_err(
            "1 +",
            ParseErrorKind::UnexpectedToken {
                found: TokenKind::EndOfInput,
                expected: vec1![
                    TokenKind::Integer,
                    TokenKind::Identifier,
                    TokenKind::ParenthesisOpen,
                    TokenKind::BraceOpen
                ],
            },
        );
    }
}
