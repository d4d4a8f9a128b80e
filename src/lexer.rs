//! The scanner. This is the first step in running a Lox program: it turns a raw source string
//! into a flat stream of tokens for the parser (`crate::parser`) to consume. Treated as a simple,
//! self-contained state machine -- there is no regex engine or DFA generator here, just a single
//! forward pass over the characters.

use crate::error::ScanError;
use crate::token::{keyword, LiteralPayload, Token, TokenKind};

/// Scans `source` into a token stream ending in a single `Eof` token.
///
/// Unlike the parser, the scanner never aborts on a bad character: it records an error and skips
/// just that character, so a single run can surface every unrecognized character in the file
/// instead of only the first. The returned `Vec<ScanError>` is empty on a clean scan.
pub fn scan(source: &str) -> (Vec<Token>, Vec<ScanError>) {
	let mut scanner = Scanner::new(source);
	scanner.run();
	(scanner.tokens, scanner.errors)
}

struct Scanner {
	chars: Vec<char>,
	start: usize,
	current: usize,
	line: usize,
	tokens: Vec<Token>,
	errors: Vec<ScanError>,
}

impl Scanner {
	fn new(source: &str) -> Self {
		Self {
			chars: source.chars().collect(),
			start: 0,
			current: 0,
			line: 1,
			tokens: Vec::new(),
			errors: Vec::new(),
		}
	}

	fn run(&mut self) {
		while !self.is_at_end() {
			self.start = self.current;
			self.scan_token();
		}
		self.tokens.push(Token::new(TokenKind::Eof, "", self.line, None));
	}

	fn is_at_end(&self) -> bool {
		self.current >= self.chars.len()
	}

	fn advance(&mut self) -> char {
		let c = self.chars[self.current];
		self.current += 1;
		c
	}

	fn peek(&self) -> char {
		self.chars.get(self.current).copied().unwrap_or('\0')
	}

	fn peek_next(&self) -> char {
		self.chars.get(self.current + 1).copied().unwrap_or('\0')
	}

	fn matches(&mut self, expected: char) -> bool {
		if self.is_at_end() || self.chars[self.current] != expected {
			return false;
		}
		self.current += 1;
		true
	}

	fn lexeme(&self) -> String {
		self.chars[self.start..self.current].iter().collect()
	}

	fn add_token(&mut self, kind: TokenKind) {
		self.add_token_with_literal(kind, None);
	}

	fn add_token_with_literal(&mut self, kind: TokenKind, literal: Option<LiteralPayload>) {
		self.tokens.push(Token::new(kind, self.lexeme(), self.line, literal));
	}

	#[allow(clippy::too_many_lines)]
	fn scan_token(&mut self) {
		let c = self.advance();
		match c {
			'(' => self.add_token(TokenKind::LeftParen),
			')' => self.add_token(TokenKind::RightParen),
			'{' => self.add_token(TokenKind::LeftBrace),
			'}' => self.add_token(TokenKind::RightBrace),
			',' => self.add_token(TokenKind::Comma),
			'.' => self.add_token(TokenKind::Dot),
			'-' => self.add_token(TokenKind::Minus),
			'+' => self.add_token(TokenKind::Plus),
			';' => self.add_token(TokenKind::Semicolon),
			'*' => self.add_token(TokenKind::Star),
			'!' => {
				let kind = if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang };
				self.add_token(kind);
			},
			'=' => {
				let kind = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
				self.add_token(kind);
			},
			'<' => {
				let kind = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
				self.add_token(kind);
			},
			'>' => {
				let kind = if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
				self.add_token(kind);
			},
			'/' => {
				if self.matches('/') {
					// A line comment runs to the end of the line and produces no token.
					while self.peek() != '\n' && !self.is_at_end() {
						self.advance();
					}
				} else {
					self.add_token(TokenKind::Slash);
				}
			},
			' ' | '\r' | '\t' => {},
			'\n' => self.line += 1,
			'"' => self.string(),
			_ if c.is_ascii_digit() => self.number(),
			_ if is_identifier_start(c) => self.identifier(),
			_ => self.errors.push(ScanError { line: self.line, message: format!("Unexpected character '{c}'.") }),
		}
	}

	fn string(&mut self) {
		while self.peek() != '"' && !self.is_at_end() {
			if self.peek() == '\n' {
				self.line += 1;
			}
			self.advance();
		}

		if self.is_at_end() {
			self.errors.push(ScanError { line: self.line, message: "Unterminated string.".to_owned() });
			return;
		}

		// The closing quote.
		self.advance();

		let value: String = self.chars[self.start + 1..self.current - 1].iter().collect();
		self.add_token_with_literal(TokenKind::String, Some(LiteralPayload::Str(value)));
	}

	fn number(&mut self) {
		while self.peek().is_ascii_digit() {
			self.advance();
		}

		let mut is_double = false;
		if self.peek() == '.' && self.peek_next().is_ascii_digit() {
			is_double = true;
			self.advance();
			while self.peek().is_ascii_digit() {
				self.advance();
			}
		}

		let text = self.lexeme();
		let literal = if is_double {
			LiteralPayload::Double(text.parse().expect("scanned number lexeme must be a valid double"))
		} else {
			match text.parse::<i64>() {
				Ok(value) => LiteralPayload::Int(value),
				// An integer literal too large for i64 still has a value; fall back to a double
				// rather than failing the whole scan over it.
				Err(_) => LiteralPayload::Double(text.parse().expect("scanned number lexeme must be a valid double")),
			}
		};
		self.add_token_with_literal(TokenKind::Number, Some(literal));
	}

	fn identifier(&mut self) {
		while is_identifier_continue(self.peek()) {
			self.advance();
		}
		let text = self.lexeme();
		let kind = keyword(&text).unwrap_or(TokenKind::Identifier);
		self.add_token(kind);
	}
}

fn is_identifier_start(c: char) -> bool {
	c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(source: &str) -> Vec<TokenKind> {
		let (tokens, errors) = scan(source);
		assert!(errors.is_empty(), "unexpected scan errors: {errors:?}");
		tokens.into_iter().map(|t| t.kind).collect()
	}

	#[test]
	fn punctuation_and_operators() {
		assert_eq!(
			kinds("(){};,+-*!===<=>=!=<>/."),
			vec![
				TokenKind::LeftParen,
				TokenKind::RightParen,
				TokenKind::LeftBrace,
				TokenKind::RightBrace,
				TokenKind::Semicolon,
				TokenKind::Comma,
				TokenKind::Plus,
				TokenKind::Minus,
				TokenKind::Star,
				TokenKind::BangEqual,
				TokenKind::EqualEqual,
				TokenKind::LessEqual,
				TokenKind::GreaterEqual,
				TokenKind::BangEqual,
				TokenKind::Less,
				TokenKind::Greater,
				TokenKind::Slash,
				TokenKind::Dot,
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn integer_vs_double_literal() {
		let (tokens, errors) = scan("1 1.5");
		assert!(errors.is_empty());
		assert_eq!(tokens[0].literal, Some(LiteralPayload::Int(1)));
		assert_eq!(tokens[1].literal, Some(LiteralPayload::Double(1.5)));
	}

	#[test]
	fn string_literal_strips_quotes() {
		let (tokens, errors) = scan("\"hello\"");
		assert!(errors.is_empty());
		assert_eq!(tokens[0].literal, Some(LiteralPayload::Str("hello".to_owned())));
	}

	#[test]
	fn unterminated_string_is_an_error() {
		let (_, errors) = scan("\"hello");
		assert_eq!(errors.len(), 1);
		assert!(errors[0].message.contains("Unterminated string"));
	}

	#[test]
	fn keywords_are_not_identifiers() {
		assert_eq!(kinds("class fun var"), vec![TokenKind::Class, TokenKind::Fun, TokenKind::Var, TokenKind::Eof]);
	}

	#[test]
	fn line_comment_is_skipped() {
		assert_eq!(kinds("1 // a comment\n2"), vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]);
	}

	#[test]
	fn unrecognized_character_is_reported_and_scanning_continues() {
		let (tokens, errors) = scan("1 @ 2");
		assert_eq!(errors.len(), 1);
		assert_eq!(tokens.iter().map(|t| t.kind).collect::<Vec<_>>(), vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]);
	}

	#[test]
	fn line_numbers_track_newlines() {
		let (tokens, _) = scan("1\n2\n3");
		assert_eq!(tokens[0].line, 1);
		assert_eq!(tokens[1].line, 2);
		assert_eq!(tokens[2].line, 3);
	}
}
