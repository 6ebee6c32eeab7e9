//! String utilities shared by the scripts and the supervisor.

/// Strip control characters from an outbound line. Raw control bytes are how
/// a reply smuggles protocol commands onto the wire, so nothing below 0x20
/// (or DEL) survives.
pub fn sanitize_outbound(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

/// Split a command tail into arguments, shell-style: whitespace separates,
/// single or double quotes group, backslash escapes the next character
/// outside single quotes. Returns an error message on an unterminated quote,
/// which scripts convert into a syntax reply.
pub fn shell_split(input: &str) -> std::result::Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => return Err("unterminated single quote".to_string()),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => current.push(escaped),
                            None => return Err("unterminated double quote".to_string()),
                        },
                        Some(inner) => current.push(inner),
                        None => return Err("unterminated double quote".to_string()),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err("trailing backslash".to_string()),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}
