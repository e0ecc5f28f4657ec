use std::{
    env,
    io::{self, Write},
    process::{Command, Stdio},
};

use anyhow::{Context, bail};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use plan_share::{
    app::AppContext,
    calendar::{Calendar, Plan, SUPPORTED_COLORS, is_supported_color},
    storage::config::UiConfig,
};

pub const USAGE: &str = "\
Usage: plan-share <command>

  signin NAME PASSWORD           sign in
  signup NAME PASSWORD           create an account
  signout                        sign out
  whoami                         show the signed-in user
  calendars                      list your calendars and shared ones
  agenda [YYYY/MM/DD]            plans on a day across active calendars
  add-calendar NAME COLOR        create a calendar
  remove-calendar ID             delete a calendar and its plans
  rename-calendar ID NAME        rename a calendar
  add-plan CALENDAR_ID NAME START END [--all-day] [--private] [--memo TEXT] [--color COLOR]
                                 START/END as YYYY-MM-DDTHH:MM (YYYY-MM-DD with --all-day)
  remove-plan PLAN_ID            delete a plan";

#[derive(Debug, Clone, PartialEq)]
pub struct PlanArgs {
    pub calendar_id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub private: bool,
    pub memo: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    SignIn { name: String, password: String },
    SignUp { name: String, password: String },
    SignOut,
    WhoAmI,
    Calendars,
    Agenda(NaiveDate),
    AddCalendar { name: String, color: String },
    RemoveCalendar(String),
    RenameCalendar { id: String, name: String },
    AddPlan(PlanArgs),
    RemovePlan(String),
    Help,
}

impl CliCommand {
    pub fn requires_session(&self) -> bool {
        !matches!(
            self,
            CliCommand::SignIn { .. } | CliCommand::SignUp { .. } | CliCommand::Help
        )
    }
}

fn required(args: &mut impl Iterator<Item = String>, what: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("Missing argument: {}", what))
}

fn parse_local(value: &str, all_day: bool, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    let naive = if all_day {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD.", value))?;
        let time = if end_of_day {
            NaiveTime::from_hms_opt(23, 59, 59)
        } else {
            NaiveTime::from_hms_opt(0, 0, 0)
        };
        date.and_time(time.ok_or_else(|| "Invalid time of day".to_string())?)
    } else {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
            .map_err(|_| format!("Invalid time '{}'. Use YYYY-MM-DDTHH:MM.", value))?
    };

    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("'{}' does not exist in the local time zone", value))
}

fn parse_plan_args(args: &mut impl Iterator<Item = String>) -> Result<PlanArgs, String> {
    let calendar_id = required(args, "CALENDAR_ID")?;
    let name = required(args, "NAME")?;
    let start = required(args, "START")?;
    let end = required(args, "END")?;

    let mut all_day = false;
    let mut private = false;
    let mut memo = String::new();
    let mut color = None;

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--all-day" => all_day = true,
            "--private" => private = true,
            "--memo" => memo = required(args, "memo text")?,
            "--color" => color = Some(required(args, "color")?),
            _ => return Err(format!("Unknown argument: {}", flag)),
        }
    }

    let start = parse_local(&start, all_day, false)?;
    let end = parse_local(&end, all_day, true)?;
    if start > end {
        return Err("Plan must not end before it starts".to_string());
    }

    Ok(PlanArgs { calendar_id, name, start, end, all_day, private, memo, color })
}

pub fn parse_cli_command(args: impl IntoIterator<Item = String>) -> Result<CliCommand, String> {
    let mut args = args.into_iter().peekable();

    let Some(command) = args.next() else {
        return Ok(CliCommand::Help);
    };

    let parsed = match command.as_str() {
        "signin" => CliCommand::SignIn {
            name: required(&mut args, "NAME")?,
            password: required(&mut args, "PASSWORD")?,
        },
        "signup" => CliCommand::SignUp {
            name: required(&mut args, "NAME")?,
            password: required(&mut args, "PASSWORD")?,
        },
        "signout" => CliCommand::SignOut,
        "whoami" => CliCommand::WhoAmI,
        "calendars" => CliCommand::Calendars,
        "agenda" => {
            let date = match args.next() {
                Some(date_str) => NaiveDate::parse_from_str(&date_str, "%Y/%m/%d")
                    .map_err(|_| format!("Invalid date '{}'. Use YYYY/MM/DD.", date_str))?,
                None => Local::now().date_naive(),
            };
            CliCommand::Agenda(date)
        }
        "add-calendar" => {
            let name = required(&mut args, "NAME")?;
            let color = required(&mut args, "COLOR")?;
            if !is_supported_color(&color) {
                return Err(format!(
                    "Unsupported color '{}'. Use one of: {}",
                    color,
                    SUPPORTED_COLORS.join(", ")
                ));
            }
            CliCommand::AddCalendar { name, color }
        }
        "remove-calendar" => CliCommand::RemoveCalendar(required(&mut args, "ID")?),
        "rename-calendar" => CliCommand::RenameCalendar {
            id: required(&mut args, "ID")?,
            name: required(&mut args, "NAME")?,
        },
        "add-plan" => {
            let plan = parse_plan_args(&mut args)?;
            if let Some(color) = &plan.color
                && !is_supported_color(color)
            {
                return Err(format!("Unsupported color '{}'", color));
            }
            CliCommand::AddPlan(plan)
        }
        "remove-plan" => CliCommand::RemovePlan(required(&mut args, "PLAN_ID")?),
        "--help" | "help" => CliCommand::Help,
        _ => return Err(format!("Unknown command: {}", command)),
    };

    if let Some(extra) = args.peek() {
        return Err(format!("Unexpected argument: {}", extra));
    }

    Ok(parsed)
}

pub async fn run_command(app: &AppContext, command: CliCommand) -> anyhow::Result<()> {
    let signed_in = app.session.is_signed_in().await;

    if command.requires_session() && !signed_in {
        bail!("Not signed in. Run `plan-share signin NAME PASSWORD` first.");
    }

    match command {
        CliCommand::SignIn { .. } | CliCommand::SignUp { .. } if signed_in => {
            let session = app.session.current().await;
            bail!("Already signed in as {}. Run `plan-share signout` first.", session.name);
        }
        CliCommand::SignIn { name, password } => {
            if !app.session.sign_in(&name, &password).await {
                bail!("Sign in failed");
            }
            println!("Signed in as {}", name);
        }
        CliCommand::SignUp { name, password } => {
            if !app.session.sign_up(&name, &password).await {
                bail!("Sign up failed");
            }
            println!("Account created. Sign in with `plan-share signin {} PASSWORD`.", name);
        }
        CliCommand::SignOut => {
            app.session.sign_out().await.context("Server did not confirm sign out")?;
            println!("Signed out");
        }
        CliCommand::WhoAmI => {
            let session = app.session.current().await;
            println!("{} ({})", session.name, session.id);
        }
        CliCommand::Calendars => {
            app.calendars.load().await?;
            let mine = app.calendars.my_calendars().await;
            let shared = app.calendars.shared_calendars().await;
            print!("{}", format_calendar_list(&mine, &shared));
        }
        CliCommand::Agenda(date) => {
            app.calendars.load().await?;
            app.calendars.set_focus_date(date).await;
            let plans = app.calendars.plans_on(app.calendars.focus_date().await).await;
            let agenda = format_agenda_text(date, &plans, &app.config.ui);
            display_with_pager(&agenda)?;
        }
        CliCommand::AddCalendar { name, color } => {
            let calendar = app.calendars.add_calendar(&name, &color).await?;
            println!("Created calendar {} ({})", calendar.name, calendar.id);
        }
        CliCommand::RemoveCalendar(id) => {
            app.calendars.load().await?;
            app.calendars.remove_calendar(&id).await?;
            println!("Removed calendar {}", id);
        }
        CliCommand::RenameCalendar { id, name } => {
            app.calendars.load().await?;
            let mut calendar = app.calendars
                .calendar(&id)
                .await
                .with_context(|| format!("No calendar with id {}", id))?;
            calendar.name = name;
            app.calendars.edit_calendar(calendar, false).await?;
            println!("Renamed calendar {}", id);
        }
        CliCommand::AddPlan(args) => {
            app.calendars.load().await?;
            let mut draft = Plan::draft(args.calendar_id, args.name, args.start, args.end);
            draft.all_day = args.all_day;
            draft.private = args.private;
            draft.memo = args.memo;
            if let Some(color) = args.color {
                draft.color = color;
            } else if let Some(calendar) = app.calendars.calendar(&draft.calendar_id).await {
                draft.color = calendar.color;
            }
            let plan = app.calendars.add_plan(draft).await?;
            println!("Created plan {} ({})", plan.name, plan.id);
        }
        CliCommand::RemovePlan(id) => {
            app.calendars.load().await?;
            let plan = app.calendars
                .plan(&id)
                .await
                .with_context(|| format!("No plan with id {}", id))?;
            app.calendars.remove_plan(&plan.id, &plan.calendar_id).await?;
            println!("Removed plan {}", id);
        }
        CliCommand::Help => println!("{}", USAGE),
    }

    Ok(())
}

fn format_calendar_line(calendar: &Calendar) -> String {
    let marker = if calendar.active { '*' } else { ' ' };
    let mut line = format!(
        "{} {:<20} {:<8} {} plans  [{}]",
        marker,
        calendar.name,
        calendar.color,
        calendar.plans.len(),
        calendar.id
    );
    if !calendar.shares.is_empty() {
        let shares: Vec<&str> = calendar.shares.iter().map(String::as_str).collect();
        line.push_str(&format!(" shared with {}", shares.join(", ")));
    }
    line
}

fn format_calendar_list(mine: &[Calendar], shared: &[Calendar]) -> String {
    let mut lines = vec!["My calendars".to_string()];
    if mine.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(mine.iter().map(format_calendar_line));

    lines.push(String::new());
    lines.push("Shared with me".to_string());
    if shared.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(shared.iter().map(format_calendar_line));

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn format_agenda_text(date: NaiveDate, plans: &[Plan], ui: &UiConfig) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Agenda – {}", date.format(&ui.date_format)));
    lines.push(String::new());

    if plans.is_empty() {
        lines.push("No plans scheduled.".to_string());
    } else {
        for plan in plans {
            lines.push(format!("- {}", build_agenda_line(plan, &ui.time_format)));
        }
    }

    lines.join("\n")
}

fn build_agenda_line(plan: &Plan, time_format: &str) -> String {
    let start_local = plan.start.with_timezone(&Local);
    let end_local = plan.end.with_timezone(&Local);
    let time_label = if plan.all_day {
        "All Day".to_string()
    } else {
        format!(
            "{}-{}",
            start_local.format(time_format),
            end_local.format(time_format)
        )
    };

    let mut line = format!("{:<13} {}", time_label, plan.name);
    if !plan.memo.is_empty() {
        line.push_str(&format!(" ({})", plan.memo));
    }
    line
}

fn display_with_pager(text: &str) -> Result<(), io::Error> {
    let pager = env::var("PAGER").unwrap_or_else(|_| "less".to_string());
    page_through(&pager, text)
}

/// Pipes `text` into `pager`, printing it directly when no pager can be run.
fn page_through(pager: &str, text: &str) -> Result<(), io::Error> {
    let mut parts = pager.split_whitespace();
    let Some(program) = parts.next() else {
        print!("{text}");
        return Ok(());
    };

    let mut child = match Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!("Could not start pager '{}': {}", program, e);
            print!("{text}");
            return Ok(());
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        // The pager may quit before reading everything.
        if let Err(e) = stdin.write_all(text.as_bytes())
            && e.kind() != io::ErrorKind::BrokenPipe
        {
            return Err(e);
        }
    }

    match child.wait() {
        Ok(status) if !status.success() => {
            tracing::warn!("Pager '{}' exited with {}", program, status);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Failed to wait for pager '{}': {}", program, e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use plan_share::storage::config::Config;
    use plan_share::sync::{api::RestApi, transport::Transport};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn offline_app() -> AppContext {
        let transport = Transport::new("http://127.0.0.1:9".to_string(), "csrf".to_string());
        let api = Arc::new(RestApi::new(transport));
        AppContext::with_apis(Config::default(), api.clone(), api, None)
    }

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn no_arguments_shows_help() {
        assert_eq!(parse_cli_command(Vec::new()), Ok(CliCommand::Help));
    }

    #[test]
    fn parse_signin() {
        assert_eq!(
            parse_cli_command(args("signin alice secret")),
            Ok(CliCommand::SignIn { name: "alice".to_string(), password: "secret".to_string() })
        );
    }

    #[test]
    fn signin_without_password_is_an_error() {
        assert!(parse_cli_command(args("signin alice")).is_err());
    }

    #[test]
    fn parse_agenda_with_date() {
        assert_eq!(
            parse_cli_command(args("agenda 2020/05/18")),
            Ok(CliCommand::Agenda(NaiveDate::from_ymd_opt(2020, 5, 18).unwrap()))
        );
    }

    #[test]
    fn agenda_without_date_uses_today() {
        assert_eq!(
            parse_cli_command(args("agenda")),
            Ok(CliCommand::Agenda(Local::now().date_naive()))
        );
    }

    #[test]
    fn add_calendar_rejects_unknown_color() {
        let err = parse_cli_command(args("add-calendar Trip purple")).unwrap_err();
        assert!(err.contains("purple"));
    }

    #[test]
    fn parse_add_plan_with_flags() {
        let parsed = parse_cli_command(args(
            "add-plan c1 Dentist 2020-05-18T09:00 2020-05-18T10:30 --private --memo bring-card --color red",
        ))
        .unwrap();

        let CliCommand::AddPlan(plan) = parsed else {
            panic!("expected add-plan");
        };
        assert_eq!(plan.calendar_id, "c1");
        assert!(plan.private);
        assert!(!plan.all_day);
        assert_eq!(plan.memo, "bring-card");
        assert_eq!(plan.color.as_deref(), Some("red"));
        assert_eq!((plan.end - plan.start).num_minutes(), 90);
    }

    #[test]
    fn all_day_plan_spans_whole_days() {
        let parsed = parse_cli_command(args("add-plan c1 Trip 2020-05-18 2020-05-19 --all-day")).unwrap();

        let CliCommand::AddPlan(plan) = parsed else {
            panic!("expected add-plan");
        };
        let start = plan.start.with_timezone(&Local);
        let end = plan.end.with_timezone(&Local);
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2020, 5, 18).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2020, 5, 19).unwrap());
        assert!(plan.all_day);
    }

    #[test]
    fn plan_ending_before_start_is_rejected() {
        assert!(parse_cli_command(args("add-plan c1 X 2020-05-18T10:00 2020-05-18T09:00")).is_err());
    }

    #[test]
    fn trailing_arguments_are_rejected() {
        assert!(parse_cli_command(args("signout now")).is_err());
    }

    #[test]
    fn only_account_commands_work_signed_out() {
        assert!(!parse_cli_command(args("signin a b")).unwrap().requires_session());
        assert!(!parse_cli_command(args("signup a b")).unwrap().requires_session());
        assert!(parse_cli_command(args("calendars")).unwrap().requires_session());
        assert!(parse_cli_command(args("signout")).unwrap().requires_session());
    }

    #[test]
    fn signed_out_user_cannot_list_calendars() {
        let app = offline_app();

        let err = tokio_test::block_on(run_command(&app, CliCommand::Calendars)).unwrap_err();

        assert!(err.to_string().contains("Not signed in"));
    }

    #[test]
    fn signed_in_user_cannot_sign_in_again() {
        let app = offline_app();
        tokio_test::block_on(app.session.set_user("u1", "alice"));

        let command = CliCommand::SignIn { name: "bob".to_string(), password: "pw".to_string() };
        let err = tokio_test::block_on(run_command(&app, command)).unwrap_err();

        assert!(err.to_string().contains("Already signed in as alice"));
    }

    #[test]
    fn pager_receives_the_agenda() {
        assert!(page_through("cat", "Agenda\n").is_ok());
    }

    #[test]
    fn pager_that_quits_early_is_not_an_error() {
        let long_agenda = "- 09:00-10:00   Dentist\n".repeat(20_000);

        assert!(page_through("true", &long_agenda).is_ok());
    }

    #[test]
    fn missing_pager_falls_back_to_stdout() {
        assert!(page_through("plan-share-no-such-pager", "Agenda\n").is_ok());
        assert!(page_through("   ", "Agenda\n").is_ok());
    }

    #[test]
    fn agenda_lists_plans_or_says_there_are_none() {
        let ui = UiConfig {
            date_format: "%Y-%m-%d".to_string(),
            time_format: "%H:%M".to_string(),
        };
        let date = NaiveDate::from_ymd_opt(2020, 5, 18).unwrap();
        let start = Local.with_ymd_and_hms(2020, 5, 18, 9, 0, 0).unwrap().with_timezone(&Utc);
        let mut plan = Plan::draft("c1", "Dentist", start, start + chrono::Duration::hours(1));
        plan.memo = "bring card".to_string();

        let empty = format_agenda_text(date, &[], &ui);
        let full = format_agenda_text(date, &[plan], &ui);

        assert!(empty.contains("No plans scheduled."));
        assert!(full.contains("09:00-10:00   Dentist (bring card)"));
        assert!(full.starts_with("Agenda – 2020-05-18"));
    }

    #[test]
    fn calendar_list_marks_active_calendars_and_shares() {
        let calendar = Calendar {
            id: "c1".to_string(),
            owner_user_id: "u1".to_string(),
            name: "Family".to_string(),
            color: "red".to_string(),
            active: true,
            shares: BTreeSet::from(["u2".to_string()]),
            plans: vec![],
        };

        let text = format_calendar_list(&[calendar], &[]);

        assert!(text.contains("* Family"));
        assert!(text.contains("shared with u2"));
        assert!(text.contains("Shared with me\n  (none)"));
    }
}
