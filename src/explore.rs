use crate::model::SiteId;
use crate::report::{render_grid, render_impacts};
use crate::session::{Session, Toggle};
use anyhow::{Context, Result, bail};
use std::io::{BufRead, Write};

const HELP: &str = "\
commands:
  toggle X Y   select or deselect the site at column X, row Y
  count N      set the maximum number of survey sites (1-100)
  reset        clear the survey
  new          generate a new scenario
  calc         compare the survey with the true impact
  show         print the grid
  help         print this message
  quit         leave
";

#[derive(Debug, PartialEq)]
enum Command {
    Toggle(SiteId),
    Count(Option<i64>),
    Reset,
    New,
    Calc,
    Show,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (name, args.as_slice()) {
        ("toggle", [x, y]) => {
            let x = x.parse::<usize>().with_context(|| format!("invalid column {x:?}"))?;
            let y = y.parse::<usize>().with_context(|| format!("invalid row {y:?}"))?;
            Command::Toggle(SiteId::new(x, y))
        }
        // Unparsable counts fall back to the configured default.
        ("count", [n]) => Command::Count(parse_leading_int(n)),
        ("reset", []) => Command::Reset,
        ("new", []) => Command::New,
        ("calc", []) => Command::Calc,
        ("show", []) => Command::Show,
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        _ => bail!("unknown command {line:?}, type help for a list"),
    };
    Ok(Some(command))
}

/// Integer at the start of `s`, ignoring whatever follows, so `7.5` reads as 7.
fn parse_leading_int(s: &str) -> Option<i64> {
    let digits_start = usize::from(s.starts_with(['+', '-']));
    let digits_end = s[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(s.len(), |idx| digits_start + idx);
    s[..digits_end].parse().ok()
}

/// Run a line-oriented session until `quit` or end of input.
pub fn run<R: BufRead, W: Write>(session: &mut Session, input: R, mut output: W) -> Result<()> {
    let decimal_places = session.cfg().display.decimal_places;
    write!(output, "{}", render_grid(session.population()))?;

    for line in input.lines() {
        let line = line.context("failed to read input")?;
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(error) => {
                writeln!(output, "{error:#}")?;
                continue;
            }
        };

        match command {
            Command::Toggle(id) => match session.toggle(id) {
                Ok(Toggle::Added) => writeln!(output, "selected {id}")?,
                Ok(Toggle::Removed) => writeln!(output, "deselected {id}")?,
                Ok(Toggle::CapacityExceeded) => writeln!(
                    output,
                    "you can only select {} sites, deselect some sites first",
                    session.max_selections()
                )?,
                Err(error) => writeln!(output, "{error:#}")?,
            },
            Command::Count(count) => {
                let count = count.unwrap_or(session.cfg().survey.site_count);
                let max = session.set_site_count(count);
                writeln!(
                    output,
                    "selected: {}/{max} sites",
                    session.survey_ids().len()
                )?;
            }
            Command::Reset => {
                session.reset();
                writeln!(output, "survey cleared")?;
            }
            Command::New => {
                session.new_scenario()?;
                write!(output, "{}", render_grid(session.population()))?;
            }
            Command::Calc => match session.check_ready() {
                Ok(()) => {
                    let impacts = session.calculate();
                    write!(output, "{}", render_impacts(&impacts, decimal_places))?;
                }
                Err(error) => writeln!(output, "{error}")?,
            },
            Command::Show => write!(output, "{}", render_grid(session.population()))?,
            Command::Help => write!(output, "{HELP}")?,
            Command::Quit => break,
        }
    }

    output.flush().context("failed to flush output")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command("toggle 3 4").unwrap(),
            Some(Command::Toggle(SiteId::new(3, 4)))
        );
        assert_eq!(parse_command("count 7").unwrap(), Some(Command::Count(Some(7))));
        assert_eq!(parse_command("count lots").unwrap(), Some(Command::Count(None)));
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("quit").unwrap(), Some(Command::Quit));
        assert!(parse_command("toggle 3").is_err());
        assert!(parse_command("toggle -1 2").is_err());
        assert!(parse_command("fly").is_err());
    }

    #[test]
    fn count_reads_leading_integer() {
        assert_eq!(parse_command("count 7.5").unwrap(), Some(Command::Count(Some(7))));
        assert_eq!(parse_command("count 12abc").unwrap(), Some(Command::Count(Some(12))));
        assert_eq!(parse_command("count -3").unwrap(), Some(Command::Count(Some(-3))));
        assert_eq!(parse_command("count +4").unwrap(), Some(Command::Count(Some(4))));
        assert_eq!(parse_command("count -").unwrap(), Some(Command::Count(None)));
        assert_eq!(parse_command("count .5").unwrap(), Some(Command::Count(None)));

        let out = transcript("count 7.5
count 250sites
");
        assert!(out.contains("selected: 0/7 sites"));
        assert!(out.contains("selected: 0/100 sites"));
    }

    fn transcript(script: &str) -> String {
        let mut session = Session::new(Config::default(), Some(31)).unwrap();
        let mut out = Vec::new();
        run(&mut session, script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn capacity_message() {
        let out = transcript("count 1\ntoggle 0 0\ntoggle 1 0\nquit\n");
        assert!(out.contains("selected: 0/1 sites"));
        assert!(out.contains("selected site-0-0"));
        assert!(out.contains("you can only select 1 sites"));
    }

    #[test]
    fn calc_requires_selection() {
        let out = transcript("calc\n");
        assert!(out.contains("select at least one survey site"));
    }

    #[test]
    fn bad_lines_do_not_stop_session() {
        let out = transcript("fly\ntoggle 99 0\ncount 0\n");
        assert!(out.contains("unknown command"));
        assert!(out.contains("outside the 10x10 grid"));
        assert!(out.contains("selected: 0/1 sites"));
    }
}
