use std::str::FromStr;

/// Commands available inside the CLI
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    ListDatabases,
    Connect(String),
    CreateDatabase {
        name: String,
        description: Option<String>,
    },
    DropDatabase(String),
    ListTables,
    DescribeTable(String),
    History,
    ToggleFavorite(String),
    RemoveHistory(String),
    Save,
    Ask(String),
    Import { path: String, name: String },
    Export(String),
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (c, arg) = if let Some((a, b)) = s.split_once(' ') {
            (a, Some(b.trim()).filter(|b| !b.is_empty()))
        } else {
            (s, None)
        };
        Ok(match (c, arg) {
            ("q", None) | ("quit", None) => Self::Quit,
            ("?", None) => Self::Help,
            ("l", None) => Self::ListDatabases,
            ("c", Some(target)) => Self::Connect(target.into()),
            ("create", Some(rest)) => match rest.split_once(' ') {
                Some((name, description)) => Self::CreateDatabase {
                    name: name.into(),
                    description: Some(description.trim().into()),
                },
                None => Self::CreateDatabase {
                    name: rest.into(),
                    description: None,
                },
            },
            ("drop", Some(target)) => Self::DropDatabase(target.into()),
            ("d", None) => Self::ListTables,
            ("d", Some(name)) => Self::DescribeTable(name.into()),
            ("h", None) => Self::History,
            ("fav", Some(id)) => Self::ToggleFavorite(id.into()),
            ("rm", Some(id)) => Self::RemoveHistory(id.into()),
            ("save", None) => Self::Save,
            ("ask", Some(prompt)) => Self::Ask(prompt.into()),
            ("import", Some(rest)) => {
                let (path, name) = rest.split_once(' ').ok_or(())?;
                Self::Import {
                    path: path.into(),
                    name: name.trim().into(),
                }
            }
            ("export", Some(path)) => Self::Export(path.into()),
            _ => return Err(()),
        })
    }
}

pub fn all_commands_info() -> Vec<(&'static str, &'static str)> {
    vec![
        ("\\q", "Quit"),
        ("\\?", "Show this help"),
        ("\\l", "List databases"),
        ("\\c <id|name>", "Switch to a database"),
        ("\\create <name> [description]", "Create a database and switch to it"),
        ("\\drop <id|name>", "Delete a database and its history"),
        ("\\d", "List tables"),
        ("\\d <table>", "Describe a table"),
        ("\\h", "Show the query history of this database"),
        ("\\fav <id>", "Toggle the favorite flag of a history entry"),
        ("\\rm <id>", "Delete a history entry"),
        ("\\save", "Persist the active database now"),
        ("\\ask <prompt>", "Generate a query from a prompt and run it"),
        ("\\import <path> <name>", "Import a database file"),
        ("\\export <path>", "Write the active database to a file"),
    ]
}
