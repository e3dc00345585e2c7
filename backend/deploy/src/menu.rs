use crate::pipeline::{Pipeline, COLLECT_STATIC, CREATE_ADMIN, DEPLOY, MIGRATE, SETUP, TEST};

pub const MENU: &str = "\
1) Run migrations
2) Collect static files
3) Run tests
4) Create admin user
5) Full deploy
6) Initial setup
0) Exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Run(Pipeline),
    Exit,
}

pub fn parse_choice(input: &str) -> Result<Choice, String> {
    match input.trim() {
        "1" => Ok(Choice::Run(MIGRATE)),
        "2" => Ok(Choice::Run(COLLECT_STATIC)),
        "3" => Ok(Choice::Run(TEST)),
        "4" => Ok(Choice::Run(CREATE_ADMIN)),
        "5" => Ok(Choice::Run(DEPLOY)),
        "6" => Ok(Choice::Run(SETUP)),
        "0" => Ok(Choice::Exit),
        other => Err(format!("Invalid choice: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("5\n"), Ok(Choice::Run(DEPLOY)));
        assert_eq!(parse_choice(" 1 "), Ok(Choice::Run(MIGRATE)));
        assert_eq!(parse_choice("0"), Ok(Choice::Exit));
        assert!(parse_choice("7").is_err());
        assert!(parse_choice("").is_err());
        assert!(parse_choice("deploy").is_err());
    }
}
