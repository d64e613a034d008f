use thiserror::Error;

pub(crate) const HELP_TEXT: &str = "\
commands:
  place <ability> <x> <y>   spend gold to place something
  abilities                 list abilities and their cost
  gold                      show the gold balance
  list                      list entities in the scene
  name                      roll a random name
  save                      write the scene to the saves folder
  help                      show this text
  quit                      leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Place { ability: String, x: i32, y: i32 },
    Abilities,
    Gold,
    List,
    Name,
    Save,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum CommandParseError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{value}' is not a valid coordinate")]
    InvalidCoordinate { value: String },
}

/// Blank lines parse to `None`.
pub(crate) fn parse_command(line: &str) -> Result<Option<Command>, CommandParseError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let bare = |command: Command, usage: &'static str| {
        if rest.is_empty() {
            Ok(Some(command))
        } else {
            Err(CommandParseError::Usage(usage))
        }
    };

    match head.to_ascii_lowercase().as_str() {
        "place" => match rest.as_slice() {
            [ability, x, y] => Ok(Some(Command::Place {
                ability: ability.to_string(),
                x: parse_coordinate(x)?,
                y: parse_coordinate(y)?,
            })),
            _ => Err(CommandParseError::Usage("place <ability> <x> <y>")),
        },
        "abilities" => bare(Command::Abilities, "abilities"),
        "gold" => bare(Command::Gold, "gold"),
        "list" => bare(Command::List, "list"),
        "name" => bare(Command::Name, "name"),
        "save" => bare(Command::Save, "save"),
        "help" | "?" => bare(Command::Help, "help"),
        "quit" | "exit" => bare(Command::Quit, "quit"),
        other => Err(CommandParseError::Unknown(other.to_string())),
    }
}

fn parse_coordinate(raw: &str) -> Result<i32, CommandParseError> {
    raw.parse().map_err(|_| CommandParseError::InvalidCoordinate {
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_takes_ability_and_coordinates() {
        assert_eq!(
            parse_command("  place place_trap 4 -2 "),
            Ok(Some(Command::Place {
                ability: "place_trap".to_string(),
                x: 4,
                y: -2
            }))
        );
        assert_eq!(
            parse_command("place place_trap 4"),
            Err(CommandParseError::Usage("place <ability> <x> <y>"))
        );
        assert_eq!(
            parse_command("place place_trap four 2"),
            Err(CommandParseError::InvalidCoordinate {
                value: "four".to_string()
            })
        );
    }

    #[test]
    fn bare_commands_reject_arguments() {
        assert_eq!(parse_command("GOLD"), Ok(Some(Command::Gold)));
        assert_eq!(parse_command("exit"), Ok(Some(Command::Quit)));
        assert_eq!(parse_command("save now"), Err(CommandParseError::Usage("save")));
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(
            parse_command("dance"),
            Err(CommandParseError::Unknown("dance".to_string()))
        );
    }
}
