use std::fmt::Write;

use super::Lexer;

/// Heading of the identifier table ("variable table"), as the legacy program prints it.
pub const IDENTIFIER_TABLE_HEADING: &str = "=== 变量表 ===";
/// Heading of the constant table ("constant table"), as the legacy program prints it.
pub const CONSTANT_TABLE_HEADING: &str = "=== 常量表 ===";

/// Tokenize `source` and render the full report.
///
/// One line per token, `<text>\t(<text> , <code>)` with `err` standing in for the code of error
/// tokens, followed by a blank line, the identifier table, another blank line and the constant
/// table. Table entries appear in first-seen order.
pub fn report(source: &str) -> String {
    let mut lexer = Lexer::new(source);
    let mut out = String::new();

    for token in lexer.by_ref() {
        let code = token.code.map_or_else(|| "err".to_string(), |c| c.to_string());
        // Writing into a String cannot fail
        let _ = writeln!(out, "{}\t({} , {})", token.text, token.text, code);
    }

    out.push('\n');
    out.push_str(IDENTIFIER_TABLE_HEADING);
    out.push('\n');
    for name in lexer.identifiers().names() {
        out.push_str(name);
        out.push('\n');
    }

    out.push('\n');
    out.push_str(CONSTANT_TABLE_HEADING);
    out.push('\n');
    for value in lexer.constants().names() {
        out.push_str(value);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_for_small_program() {
        let expected = "\
int\t(int , 14)
x\t(x , 41)
=\t(= , 21)
10\t(10 , 51)
;\t(; , 32)
if\t(if , 11)
x\t(x , 41)
>=\t(>= , 22)
2\t(2 , 52)
then\t(then , 12)
y\t(y , 42)
=\t(= , 21)
x\t(x , 41)
%\t(% , 26)
2\t(2 , 52)
;\t(; , 32)

=== 变量表 ===
x
y

=== 常量表 ===
10
2
";
        assert_eq!(report("int x = 10;\nIF x >= 2 THEN y = x % 2;"), expected);
    }

    #[test]
    fn test_report_marks_errors() {
        let out = report("1a < $");
        assert!(out.starts_with("1a\t(1a , err)\n<\t(< , err)\n$\t($ , err)\n"));
    }

    #[test]
    fn test_report_for_empty_input() {
        assert_eq!(report(""), "\n=== 变量表 ===\n\n=== 常量表 ===\n");
    }
}
