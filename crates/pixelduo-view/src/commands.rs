//! Line commands typed into the terminal view.

use std::path::PathBuf;

use pixelduo_core::{Color, Tool};
use thiserror::Error;

/// A parsed user command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Draw { row: usize, col: usize, color: Color },
    Erase { row: usize, col: usize },
    Fill { row: usize, col: usize, color: Color },
    /// Apply the current tool at a cell
    Click { row: usize, col: usize },
    SetTool(Tool),
    SetColor(Color),
    Undo,
    Redo,
    Clear,
    Export(PathBuf),
    Show,
    Log,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Invalid color (expected #RRGGBB): {0}")]
    InvalidColor(String),
}

pub const HELP: &str = "\
draw <row> <col> <#RRGGBB>   paint one cell
erase <row> <col>            empty one cell
fill <row> <col> <#RRGGBB>   flood fill a region
click <row> <col>            apply the current tool
tool draw|erase|fill         select a tool
color <#RRGGBB>              select a color
undo | redo | clear
export <file.png>            save the room's grid as PNG
show | log | help | quit";

/// Parse one input line.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Err(CommandError::Usage("help"));
    };
    let args: Vec<&str> = words.collect();

    let cmd = match (name, args.as_slice()) {
        ("draw" | "d", [row, col, color]) => Command::Draw {
            row: number(row)?,
            col: number(col)?,
            color: color_arg(color)?,
        },
        ("draw" | "d", _) => return Err(CommandError::Usage("draw <row> <col> <#RRGGBB>")),
        ("erase" | "e", [row, col]) => Command::Erase {
            row: number(row)?,
            col: number(col)?,
        },
        ("erase" | "e", _) => return Err(CommandError::Usage("erase <row> <col>")),
        ("fill" | "f", [row, col, color]) => Command::Fill {
            row: number(row)?,
            col: number(col)?,
            color: color_arg(color)?,
        },
        ("fill" | "f", _) => return Err(CommandError::Usage("fill <row> <col> <#RRGGBB>")),
        ("click", [row, col]) => Command::Click {
            row: number(row)?,
            col: number(col)?,
        },
        ("click", _) => return Err(CommandError::Usage("click <row> <col>")),
        ("tool", [tool]) => Command::SetTool(match *tool {
            "draw" => Tool::Draw,
            "erase" => Tool::Erase,
            "fill" => Tool::Fill,
            _ => return Err(CommandError::Usage("tool draw|erase|fill")),
        }),
        ("tool", _) => return Err(CommandError::Usage("tool draw|erase|fill")),
        ("color", [color]) => Command::SetColor(color_arg(color)?),
        ("color", _) => return Err(CommandError::Usage("color <#RRGGBB>")),
        ("export", [path]) => Command::Export(PathBuf::from(path)),
        ("export", _) => return Err(CommandError::Usage("export <file.png>")),
        ("undo" | "u", []) => Command::Undo,
        ("redo" | "r", []) => Command::Redo,
        ("clear", []) => Command::Clear,
        ("show", []) => Command::Show,
        ("log", []) => Command::Log,
        ("help" | "?", []) => Command::Help,
        ("quit" | "q" | "exit", []) => Command::Quit,
        _ => return Err(CommandError::Unknown(line.trim().to_string())),
    };
    Ok(cmd)
}

fn number(arg: &str) -> Result<usize, CommandError> {
    arg.parse().map_err(|_| CommandError::InvalidNumber(arg.to_string()))
}

fn color_arg(arg: &str) -> Result<Color, CommandError> {
    Color::parse_hex(arg).ok_or_else(|| CommandError::InvalidColor(arg.to_string()))
}
