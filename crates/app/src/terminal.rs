//! Line-oriented terminal front end for a running session.

use std::io;
use std::time::Duration;

use exam_core::model::{QuestionStatus, TestMode, TestResult};
use exam_core::{PaletteState, format_clock};
use services::{
    LiveSession, PracticeFeedback, SessionError, SessionHost, SessionState, SubmitSummary,
    TickReport,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{MissedTickBehavior, interval};

/// Option letters; `H` is skipped so `h` stays the help command.
const OPTION_LABELS: &str = "ABCDEFGIJKL";

/// Prints results and exit notices to stdout.
#[derive(Debug, Default)]
pub struct TerminalHost;

impl TerminalHost {
    pub fn new() -> Self {
        Self
    }
}

impl SessionHost for TerminalHost {
    fn on_complete(&self, result: TestResult) {
        print_result(&result);
    }

    fn on_exit(&self) {
        println!("Left the session. Run `exam-app resume` to continue if it was saved.");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Choose(usize),
    Next,
    Previous,
    Goto(usize),
    Mark,
    MarkAndNext,
    Clear,
    Pause,
    Resume,
    Save,
    Submit,
    Confirm,
    Cancel,
    Quit,
    Palette,
    Time,
    Show,
    Help,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let word = parts.next()?.to_ascii_lowercase();

    if word.len() == 1 {
        let label = word.to_ascii_uppercase();
        if let Some(index) = OPTION_LABELS.find(label.as_str()) {
            return Some(Input::Choose(index));
        }
    }

    let input = match word.as_str() {
        "n" | "next" => Input::Next,
        "p" | "prev" => Input::Previous,
        "go" => {
            let number: usize = parts.next()?.parse().ok()?;
            Input::Goto(number.checked_sub(1)?)
        }
        "m" | "mark" => Input::Mark,
        "mn" => Input::MarkAndNext,
        "x" | "clear" => Input::Clear,
        "pause" => Input::Pause,
        "r" | "resume" => Input::Resume,
        "save" => Input::Save,
        "s" | "submit" => Input::Submit,
        "y" | "yes" => Input::Confirm,
        "no" => Input::Cancel,
        "q" | "quit" => Input::Quit,
        "palette" => Input::Palette,
        "t" | "time" => Input::Time,
        "show" => Input::Show,
        "h" | "help" | "?" => Input::Help,
        _ => return None,
    };
    Some(input)
}

enum Flow {
    Continue,
    Exit,
    Abandon,
}

/// Run the one-second clock and the command loop until the session ends or
/// the user leaves it.
///
/// # Errors
///
/// Returns an I/O error if stdin cannot be read.
pub async fn drive(mut live: LiveSession) -> Result<(), io::Error> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    print_help();
    render(&live);
    let mut warned_low_time = live.machine().timer().is_low_time();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let TickReport::Submitted(_) = live.tick().await {
                    println!("Time is up. The test was submitted automatically.");
                    return Ok(());
                }
                if !warned_low_time && live.machine().timer().is_low_time() {
                    warned_low_time = true;
                    println!("Less than 5 minutes left.");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    leave(&mut live).await;
                    return Ok(());
                };
                match handle(&mut live, &line).await {
                    Flow::Continue => {}
                    Flow::Exit => return Ok(()),
                    Flow::Abandon => {
                        live.abandon().await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn handle(live: &mut LiveSession, line: &str) -> Flow {
    let Some(input) = parse_input(line) else {
        if !line.trim().is_empty() {
            println!("Unknown command. Type `help` for the list.");
        }
        return Flow::Continue;
    };

    let outcome: Result<Flow, SessionError> = match input {
        Input::Choose(index) => choose(live, index).await.map(|()| Flow::Continue),
        Input::Next if live.machine().is_last_question() => {
            live.request_submit().map(|summary| {
                print_submit_summary(&summary);
                Flow::Continue
            })
        }
        Input::Next => moved(live.next().await),
        Input::Previous => moved(live.previous().await),
        Input::Goto(index) => moved(live.navigate_to(index).await),
        Input::Mark => live.toggle_mark().await.map(|marked| {
            println!("{}", if marked { "Marked for review." } else { "Mark removed." });
            Flow::Continue
        }),
        Input::MarkAndNext => moved(live.mark_and_next().await),
        Input::Clear => live.clear_response().await.map(|cleared| {
            println!("{}", if cleared { "Response cleared." } else { "Nothing to clear." });
            Flow::Continue
        }),
        Input::Pause => live.pause().await.map(|()| {
            println!("Paused. Type `resume` to continue.");
            Flow::Continue
        }),
        Input::Resume => live.resume().await.map(|()| Flow::Continue),
        Input::Save => live.save_and_pause().await.map(|()| {
            if !live.is_durable() {
                println!("Warning: the session could not be saved and will not be resumable.");
            }
            Flow::Exit
        }),
        Input::Submit => live.request_submit().map(|summary| {
            print_submit_summary(&summary);
            Flow::Continue
        }),
        Input::Confirm => live.confirm_submit().await.map(|_| Flow::Exit),
        Input::Cancel => live.cancel_submit().map(|()| Flow::Continue),
        Input::Quit => return Flow::Abandon,
        Input::Palette => {
            print_palette(live);
            return Flow::Continue;
        }
        Input::Time => {
            print_time(live);
            return Flow::Continue;
        }
        Input::Show => Ok(Flow::Continue),
        Input::Help => {
            print_help();
            return Flow::Continue;
        }
    };

    match outcome {
        Ok(Flow::Continue) => {
            if live.state() != SessionState::AwaitingSubmitConfirmation {
                render(live);
            }
            Flow::Continue
        }
        Ok(flow) => flow,
        Err(err) => {
            println!("{err}");
            Flow::Continue
        }
    }
}

fn moved(result: Result<bool, SessionError>) -> Result<Flow, SessionError> {
    result.map(|moved| {
        if !moved {
            println!("No question there.");
        }
        Flow::Continue
    })
}

async fn choose(live: &mut LiveSession, index: usize) -> Result<(), SessionError> {
    let Some(option) = live.machine().current_question().options.get(index).cloned() else {
        println!("No such option.");
        return Ok(());
    };
    // Practice feedback is shown by the next render.
    live.select(&option).await?;
    Ok(())
}

/// Leave on end of input, keeping a resumable snapshot.
async fn leave(live: &mut LiveSession) {
    match live.state() {
        SessionState::Submitted => return,
        SessionState::Paused => {
            if let Err(err) = live.resume().await {
                tracing::debug!(error = %err, "could not resume before saving on exit");
            }
        }
        SessionState::AwaitingSubmitConfirmation => {
            if let Err(err) = live.cancel_submit() {
                tracing::debug!(error = %err, "could not close submit prompt on exit");
            }
        }
        SessionState::Active => {}
    }
    if let Err(err) = live.save_and_pause().await {
        tracing::warn!(error = %err, "could not save session on exit");
    }
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn clock_line(live: &LiveSession) -> String {
    let timer = live.machine().timer();
    let label = if timer.is_countdown() { "left" } else { "elapsed" };
    let low = if timer.is_low_time() { " (LOW)" } else { "" };
    format!("{} {label}{low}", format_clock(timer.display_secs()))
}

fn render(live: &LiveSession) {
    let machine = live.machine();
    let index = machine.current_index();
    println!();
    println!(
        "[{}/{}] {} | {}",
        index + 1,
        machine.total_questions(),
        machine.session().config.mode(),
        clock_line(live)
    );

    let Some(question) = machine.visible_question() else {
        println!("(question hidden while paused)");
        return;
    };

    println!("{} | {}", question.topic, question.difficulty);
    println!("{}", question.text);
    for line in option_lines(&question.options, machine.ledger().answer(question.id)) {
        println!("{line}");
    }
    if machine.ledger().is_marked(question.id) {
        println!("  [marked for review]");
    }

    if machine.session().config.mode() == TestMode::Practice {
        if let Some(feedback) = machine.feedback(index) {
            print_feedback(&feedback);
        }
        let stats = machine.practice_stats();
        println!(
            "correct {} | wrong {} | attempted {}/{} | marked {}",
            stats.correct,
            stats.wrong,
            stats.attempted,
            machine.total_questions(),
            stats.marked
        );
    }
}

fn option_lines(options: &[String], selected: Option<&str>) -> Vec<String> {
    let mut lines: Vec<String> = OPTION_LABELS
        .chars()
        .zip(options)
        .map(|(label, option)| {
            let pointer = if selected == Some(option.as_str()) { ">" } else { " " };
            format!(" {pointer} {label}) {option}")
        })
        .collect();
    let hidden = options.len().saturating_sub(OPTION_LABELS.len());
    if hidden > 0 {
        lines.push(format!("   ({hidden} more option(s) cannot be chosen from the terminal)"));
    }
    lines
}

fn print_feedback(feedback: &PracticeFeedback) {
    match feedback.status {
        QuestionStatus::Correct => println!("  Correct."),
        QuestionStatus::Wrong => println!("  Wrong. Correct answer: {}", feedback.correct_option),
    }
    if !feedback.explanation.is_empty() {
        println!("  {}", feedback.explanation);
    }
}

fn print_time(live: &LiveSession) {
    println!("{}", clock_line(live));
}

fn print_palette(live: &LiveSession) {
    let palette = live.machine().palette();
    let cells: Vec<String> = palette
        .entries
        .iter()
        .map(|entry| {
            let symbol = match entry.state {
                PaletteState::Marked if entry.is_marked_and_answered => "M*",
                PaletteState::Marked => "M",
                PaletteState::Answered => "A",
                PaletteState::NotAnswered => "-",
                PaletteState::NotVisited => ".",
            };
            let current = if entry.is_current { "<" } else { "" };
            format!("{}:{symbol}{current}", entry.index + 1)
        })
        .collect();
    for row in cells.chunks(10) {
        println!("{}", row.join("  "));
    }
    println!(
        "Answered {} | Not answered {} | Marked {} | Not visited {}",
        palette.answered, palette.not_answered, palette.marked, palette.not_visited
    );
}

fn print_submit_summary(summary: &SubmitSummary) {
    println!();
    println!("Submit test?");
    println!(
        "  answered {} | marked {} | skipped {} of {}",
        summary.answered, summary.marked, summary.skipped, summary.total
    );
    if let Some(left) = summary.time_left_secs {
        println!("  time left {}", format_clock(left));
    }
    println!("Type `yes` to submit or `no` to keep going.");
}

fn print_result(result: &TestResult) {
    println!();
    println!("=== {} ({}) ===", result.test_name, result.mode);
    println!(
        "Score {:.2}/{} | {:.1}% | {:?}",
        result.total_score, result.max_score, result.percentage, result.status
    );
    println!(
        "correct {} | wrong {} | unattempted {} | time {}",
        result.correct_count,
        result.wrong_count,
        result.unattempted_count,
        format_clock(result.total_time_seconds)
    );
    println!("By topic:");
    for topic in &result.topic_analysis {
        println!(
            "  {:<24} {:>3}/{:<3} {:>5.1}%  {}",
            topic.topic,
            topic.correct,
            topic.total_questions,
            topic.accuracy,
            format_clock(topic.time_spent)
        );
    }
    println!("By difficulty:");
    for level in &result.difficulty_analysis {
        println!(
            "  {:<24} {:>3}/{:<3} {:>5.1}%",
            level.difficulty.as_str(),
            level.correct,
            level.total_questions,
            level.accuracy
        );
    }
}

fn print_help() {
    println!("Commands:");
    println!("  a..l       choose an option        n / p      next / previous");
    println!("  go <k>     jump to question k      m / mn     toggle mark / mark and next");
    println!("  x          clear response (exam)   palette    question overview");
    println!("  pause      pause (practice)        resume     continue after pause");
    println!("  save       save and leave          submit     submit the test");
    println!("  t          time                    quit       leave without saving");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use exam_core::model::{Difficulty, Question, QuestionId, TestConfigDraft, TestSession};
    use exam_core::time::fixed_now;
    use services::{Clock, SessionRunner};
    use storage::repository::InMemoryRepository;

    fn practice_session() -> TestSession {
        let questions = (1..=3)
            .map(|id| Question {
                id: QuestionId::new(id),
                text: format!("Q{id}"),
                options: vec!["A".into(), "B".into()],
                answer: "A".into(),
                explanation: String::new(),
                difficulty: Difficulty::Easy,
                topic: "Terminal".into(),
            })
            .collect();
        let mut draft = TestConfigDraft::with_defaults("Terminal", TestMode::Practice);
        draft.question_count = 3;
        TestSession::new(draft.validate().unwrap(), questions, fixed_now()).unwrap()
    }

    async fn left_in(state: SessionState) -> Option<TestSession> {
        let repo = Arc::new(InMemoryRepository::new());
        let runner =
            SessionRunner::new(Clock::fixed(fixed_now()), repo, Arc::new(TerminalHost::new()));
        let mut live = runner.start(practice_session()).await.unwrap();
        live.select("A").await.unwrap();
        match state {
            SessionState::Paused => live.pause().await.unwrap(),
            SessionState::AwaitingSubmitConfirmation => {
                live.request_submit().unwrap();
            }
            _ => {}
        }
        assert_eq!(live.state(), state);

        leave(&mut live).await;
        assert_eq!(live.state(), SessionState::Paused);
        runner.resumable().await
    }

    #[tokio::test]
    async fn end_of_input_saves_from_every_open_state() {
        for state in [
            SessionState::Active,
            SessionState::Paused,
            SessionState::AwaitingSubmitConfirmation,
        ] {
            let stored = left_in(state).await.expect("resumable after leaving");
            let progress = stored.progress.expect("progress");
            assert_eq!(progress.answers[&QuestionId::new(1)], "A");
        }
    }

    #[test]
    fn parses_option_letters_case_insensitively() {
        assert_eq!(parse_input("a"), Some(Input::Choose(0)));
        assert_eq!(parse_input(" D "), Some(Input::Choose(3)));
    }

    #[test]
    fn option_letters_skip_the_help_key() {
        assert_eq!(parse_input("g"), Some(Input::Choose(6)));
        assert_eq!(parse_input("h"), Some(Input::Help));
        assert_eq!(parse_input("i"), Some(Input::Choose(7)));
        assert_eq!(parse_input("L"), Some(Input::Choose(10)));
    }

    #[test]
    fn options_past_the_last_letter_are_reported() {
        let options: Vec<String> = (1..=13).map(|n| format!("choice {n}")).collect();
        let lines = option_lines(&options, Some("choice 2"));
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[1], " > B) choice 2");
        assert_eq!(lines[10], "   L) choice 11");
        assert!(lines[11].contains("2 more option(s)"));

        let short = option_lines(&options[..4], None);
        assert_eq!(short.len(), 4);
    }

    #[test]
    fn goto_is_one_based() {
        assert_eq!(parse_input("go 3"), Some(Input::Goto(2)));
        assert_eq!(parse_input("go 0"), None);
        assert_eq!(parse_input("go"), None);
    }

    #[test]
    fn unknown_words_are_rejected() {
        assert_eq!(parse_input("dance"), None);
        assert_eq!(parse_input(""), None);
    }
}
