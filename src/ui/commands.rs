use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Exit,
    Help,
    Clear,
    Regenerate,
    Undo,
    Models,
    Model(String),
    Settings,
    System(String),
    Temperature(f32),
    MaxTokens(u32),
    Message(String),
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("exit") || s.eq_ignore_ascii_case("quit") {
            return Ok(Command::Exit);
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Ok(Command::Message(s.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        Ok(match name.to_lowercase().as_str() {
            "exit" | "quit" => Command::Exit,
            "help" | "?" => Command::Help,
            "clear" => Command::Clear,
            "regen" | "regenerate" => Command::Regenerate,
            "undo" => Command::Undo,
            "models" => Command::Models,
            "model" if arg.is_empty() => return Err("usage: /model <id>".to_string()),
            "model" => Command::Model(arg.to_string()),
            "settings" => Command::Settings,
            "system" => Command::System(arg.to_string()),
            "temperature" | "temp" => Command::Temperature(
                arg.parse()
                    .map_err(|_| format!("'{arg}' is not a number; usage: /temperature 0.7"))?,
            ),
            "max-tokens" | "tokens" => Command::MaxTokens(
                arg.parse()
                    .map_err(|_| format!("'{arg}' is not a whole number; usage: /max-tokens 2000"))?,
            ),
            other => return Err(format!("unknown command '/{other}', try /help")),
        })
    }
}

pub const COMMAND_BOX: &str = "\
┌──────────────────────────────────────────────┐\n\
│               Available Commands             │\n\
├──────────────────────────────────────────────┤\n\
│  /regen            - Regenerate last reply   │\n\
│  /undo             - Remove last exchange    │\n\
│  /clear            - Clear this chat         │\n\
├──────────────────────────────────────────────┤\n\
│  /models           - List models             │\n\
│  /model <id>       - Switch model            │\n\
│  /settings         - Show model settings     │\n\
│  /system <text>    - Set system prompt       │\n\
│  /temperature <v>  - 0.0 to 2.0              │\n\
│  /max-tokens <n>   - 100 to 4000             │\n\
├──────────────────────────────────────────────┤\n\
│  /help             - Show this box           │\n\
│  exit              - Quit the application    │\n\
└──────────────────────────────────────────────┘";
