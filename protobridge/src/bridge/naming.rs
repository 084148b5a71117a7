//! Go identifier conventions shared by the generated files

/// Field and message identifier `protoc-gen-go` derives from a schema name
///
/// `.x` joins words, a leading `_` becomes `X`, `_x` starts a new word, and every word starts
/// upper case.
pub(crate) fn go_camel_case(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = String::with_capacity(name.len());
    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        let next_is_lower = bytes.get(index + 1).is_some_and(u8::is_ascii_lowercase);
        match byte {
            b'.' if next_is_lower => {}
            b'.' => out.push('_'),
            b'_' if index == 0 || bytes[index - 1] == b'.' => out.push('X'),
            b'_' if next_is_lower => {}
            _ if byte.is_ascii_digit() => out.push(char::from(byte)),
            _ => {
                out.push(char::from(byte.to_ascii_uppercase()));
                while bytes.get(index + 1).is_some_and(u8::is_ascii_lowercase) {
                    index += 1;
                    out.push(char::from(bytes[index]));
                }
            }
        }
        index += 1;
    }
    out
}

/// Import alias for the generated bindings of schema package `package`
pub(crate) fn binding_alias(package: &str) -> String { format!("pb{}", package.replace('_', "")) }

/// Helper function name for a struct conversion, `decodeDepNode` style
pub(crate) fn helper_name(prefix: &str, package: &str, type_name: &str) -> String {
    format!("{prefix}{}{}", go_camel_case(package), go_camel_case(type_name))
}

/// Local variable for the native parameter at `index`
pub(crate) fn argument(index: usize) -> String { format!("arg{index}") }

/// Local variable for the native result at `index`
pub(crate) fn result(index: usize) -> String { format!("ret{index}") }
