//! Parsing of lines typed at the prompt.

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    /// Post the text to the channel.
    Say(String),
    Online,
    /// Trust the online user with this name.
    Trust(String),
    Quit,
    /// A `/` command we do not know.
    Unknown(String),
    Blank,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Input::Blank;
        }
        let Some(command) = trimmed.strip_prefix('/') else {
            return Input::Say(line.trim_end_matches(['\r', '\n']).to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "quit" | "exit" => Input::Quit,
            "online" => Input::Online,
            "trust" if !arg.is_empty() => Input::Trust(arg.to_string()),
            _ => Input::Unknown(trimmed.to_string()),
        }
    }
}
