//! Line-based prompts for the guided setup.
//!
//! Every question returns `None` when the user quits (`q`) or input ends,
//! so callers can abort cleanly with exit status 0.

use deck_core::detect::DetectedProject;
use deck_core::types::{Domain, Need};
use std::io::{BufRead, Write};

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `question` and read one trimmed line. `None` on EOF or `q`.
    pub fn ask(&mut self, question: &str) -> anyhow::Result<Option<String>> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        let answer = line.trim().to_string();
        if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
            return Ok(None);
        }
        Ok(Some(answer))
    }

    fn say(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    /// Domain menu. The detected domain is marked as a hint only; an empty
    /// answer asks again rather than accepting it.
    pub fn choose_domain(&mut self, detected: &DetectedProject) -> anyhow::Result<Option<Domain>> {
        let hint = detected.suggested_domain();
        self.say("What kind of project is this?")?;
        for d in Domain::all() {
            let mark = if Some(*d) == hint { "  (detected)" } else { "" };
            self.say(&format!("  {}) {:<14} {}{mark}", d.menu_number(), d.as_str(), d.label()))?;
        }
        if let (Some(d), Some(fw)) = (hint, detected.framework) {
            self.say(&format!("Detected {} project; {} looks like a match.", fw.as_str(), d))?;
        }
        loop {
            let Some(answer) = self.ask("Domain [1-7, q to quit]: ")? else {
                return Ok(None);
            };
            if answer.is_empty() {
                self.say("  please pick a domain")?;
                continue;
            }
            match parse_domain_choice(&answer) {
                Some(d) => return Ok(Some(d)),
                None => self.say(&format!("  '{answer}' is not a domain"))?,
            }
        }
    }

    /// Needs menu. Empty answer means no needs.
    pub fn choose_needs(&mut self) -> anyhow::Result<Option<Vec<Need>>> {
        self.say("Which extras do you want? (space or comma separated, blank for none)")?;
        for n in Need::all() {
            self.say(&format!("  {}) {:<8} {}", n.menu_number(), n.as_str(), n.label()))?;
        }
        loop {
            let Some(answer) = self.ask("Needs: ")? else {
                return Ok(None);
            };
            match parse_needs_choice(&answer) {
                Ok(needs) => return Ok(Some(needs)),
                Err(bad) => self.say(&format!("  '{bad}' is not a need"))?,
            }
        }
    }

    /// Yes/no with a default for an empty answer.
    pub fn confirm(&mut self, question: &str, default: bool) -> anyhow::Result<Option<bool>> {
        let suffix = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let Some(answer) = self.ask(&format!("{question} {suffix} "))? else {
                return Ok(None);
            };
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(Some(default)),
                "y" | "yes" => return Ok(Some(true)),
                "n" | "no" => return Ok(Some(false)),
                _ => self.say("  answer y or n")?,
            }
        }
    }

    /// Optional collection name; blank skips. Outer `None` means quit.
    pub fn collection_name(&mut self) -> anyhow::Result<Option<Option<String>>> {
        loop {
            let Some(answer) =
                self.ask("Save these choices as a collection? Name (blank to skip): ")?
            else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(Some(None));
            }
            match deck_core::paths::validate_name(&answer) {
                Ok(()) => return Ok(Some(Some(answer))),
                Err(e) => self.say(&format!("  {e}"))?,
            }
        }
    }
}

/// A menu number or a domain name.
pub fn parse_domain_choice(answer: &str) -> Option<Domain> {
    if let Ok(n) = answer.parse::<usize>() {
        return Domain::from_menu_number(n);
    }
    answer.to_ascii_lowercase().parse().ok()
}

/// Menu numbers or need names. Returns the first bad token on failure.
pub fn parse_needs_choice(answer: &str) -> Result<Vec<Need>, String> {
    let mut needs = Vec::new();
    for token in answer.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let need = match token.parse::<usize>() {
            Ok(n) => Need::from_menu_number(n),
            Err(_) => token.to_ascii_lowercase().parse().ok(),
        };
        needs.push(need.ok_or_else(|| token.to_string())?);
    }
    needs.sort();
    needs.dedup();
    Ok(needs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::detect::Framework;

    fn prompter(input: &str) -> Prompter<&[u8], Vec<u8>> {
        Prompter::new(input.as_bytes(), Vec::new())
    }

    #[test]
    fn domain_by_number_or_name() {
        assert_eq!(parse_domain_choice("3"), Some(Domain::Backend));
        assert_eq!(parse_domain_choice("Frontend"), Some(Domain::Frontend));
        assert_eq!(parse_domain_choice("0"), None);
        assert_eq!(parse_domain_choice("8"), None);
    }

    #[test]
    fn needs_mixed_tokens() {
        assert_eq!(parse_needs_choice("1, docs 1").unwrap(), vec![Need::Git, Need::Docs]);
        assert_eq!(parse_needs_choice("").unwrap(), vec![]);
        assert_eq!(parse_needs_choice("git bogus").unwrap_err(), "bogus");
    }

    #[test]
    fn empty_domain_answer_reprompts_even_with_hint() {
        let detected = DetectedProject {
            language: None,
            framework: Some(Framework::React),
        };
        let mut p = prompter("\nx\n5\n");
        assert_eq!(p.choose_domain(&detected).unwrap(), Some(Domain::Devops));
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("4) frontend"));
        assert!(shown.contains("(detected)"));
        assert!(shown.contains("'x' is not a domain"));
    }

    #[test]
    fn quit_and_eof_abort() {
        let none = DetectedProject::default();
        assert_eq!(prompter("q\n").choose_domain(&none).unwrap(), None);
        assert_eq!(prompter("").choose_domain(&none).unwrap(), None);
        assert_eq!(prompter("").choose_needs().unwrap(), None);
        assert_eq!(prompter("").confirm("Go?", true).unwrap(), None);
    }

    #[test]
    fn confirm_defaults() {
        assert_eq!(prompter("\n").confirm("Go?", true).unwrap(), Some(true));
        assert_eq!(prompter("\n").confirm("Go?", false).unwrap(), Some(false));
        assert_eq!(prompter("maybe\nn\n").confirm("Go?", true).unwrap(), Some(false));
    }

    #[test]
    fn collection_name_validates() {
        assert_eq!(prompter("\n").collection_name().unwrap(), Some(None));
        assert_eq!(
            prompter("Bad Name\nml-kit\n").collection_name().unwrap(),
            Some(Some("ml-kit".to_string()))
        );
    }
}
