//! The `io` module: `io.println` and `io.print`, both supporting `{}`
//! positional interpolation over any number of arguments.

use crate::{common::value::Value, modules::register_native, vm::error::RuntimeError};

pub fn init(globals: &mut crate::common::table::StringTable<Value>) {
    register_native(globals, "io.println", |args| render(args).map(|text| {
        println!("{}", text);
        Value::Nil
    }));
    register_native(globals, "io.print", |args| render(args).map(|text| {
        print!("{}", text);
        Value::Nil
    }));
}

/// If the first argument is a string and there is more than one
/// argument, substitutes each `{}` in order with the remaining
/// arguments' `Display` output; otherwise renders the first value
/// directly. Zero arguments renders as an empty string —
/// `io.println()` emits just the terminator, `io.print()` emits
/// nothing.
fn render(args: &[Value]) -> Result<String, RuntimeError> {
    match args.split_first() {
        None => Ok(String::new()),
        Some((Value::String(format), rest)) if !rest.is_empty() => Ok(interpolate(format.as_str(), rest)),
        Some((first, _)) => Ok(first.to_string()),
    }
}

/// Replaces each `{}` in `format`, left to right, with the `Display` of
/// the corresponding entry in `args`. Extra `{}` placeholders beyond
/// the argument count are left verbatim; extra arguments beyond the
/// placeholder count are silently unused.
fn interpolate(format: &str, args: &[Value]) -> String {
    let mut output = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '{' && format[i..].starts_with("{}") {
            chars.next(); // consume '}'
            match args.next() {
                Some(value) => output.push_str(&value.to_string()),
                None => output.push_str("{}"),
            }
        } else {
            output.push(c);
        }
    }

    output
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_string_argument_renders_directly() {
        assert_eq!(render(&[Value::string("Hello, World!")]).unwrap(), "Hello, World!");
    }

    #[test]
    fn single_non_string_argument_renders_via_display() {
        assert_eq!(render(&[Value::Int(14)]).unwrap(), "14");
    }

    #[test]
    fn interpolates_in_order() {
        let args = [Value::string("{} < {} = {}"), Value::Int(7), Value::Int(10), Value::Bool(true)];
        assert_eq!(render(&args).unwrap(), "7 < 10 = true");
    }

    #[test]
    fn zero_arguments_renders_empty() {
        assert_eq!(render(&[]).unwrap(), "");
    }

    #[test]
    fn extra_placeholder_left_verbatim() {
        assert_eq!(render(&[Value::string("{} {}"), Value::Int(1)]).unwrap(), "1 {}");
    }
}
