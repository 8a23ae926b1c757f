use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use clap::{value_parser, Arg, Command};
use egui::{Align, Layout};

use crate::{
    config::LevelCatalog,
    level::{LevelSummary, UploadSummary},
};

/// Requests the overlay hands back to the application. The overlay never
/// touches the level itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiAction {
    /// Zero-based catalog index.
    LoadLevel(usize),
    Reload,
}

/// What the application last did with the current level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelStatus {
    /// Zero-based catalog index of the resident level.
    pub current: Option<usize>,
    pub name: String,
    pub instances: usize,
    pub load: LevelSummary,
    pub upload: UploadSummary,
}

impl LevelStatus {
    pub fn describe(&self) -> String {
        let name = if self.name.is_empty() { "<none>" } else { self.name.as_str() };
        format!(
            "{name}: {} instances, {} missing assets, {} malformed records, \
             {} lights ignored, {} uploaded, {} failed",
            self.instances,
            self.load.missing_assets,
            self.load.malformed_records,
            self.load.lights,
            self.upload.uploaded,
            self.upload.failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleReply {
    pub text: String,
    pub action: Option<GuiAction>,
}

impl ConsoleReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: None,
        }
    }
}

fn console_command() -> Command {
    Command::new("console")
        .no_binary_name(true)
        .disable_version_flag(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("load")
                .about("Loads a level by its number in the list")
                .arg(
                    Arg::new("n")
                        .required(true)
                        .value_parser(value_parser!(u32).range(1..)),
                ),
        )
        .subcommand(Command::new("reload").about("Reloads the current level from disk"))
        .subcommand(Command::new("levels").about("Lists the available levels"))
        .subcommand(Command::new("stats").about("Shows what the last load found"))
        .subcommand(
            Command::new("echo")
                .about("Prints text")
                .arg(Arg::new("text").required(true).num_args(1..)),
        )
}

pub fn process_console_command(
    command: &str,
    catalog: &LevelCatalog,
    status: &LevelStatus,
) -> ConsoleReply {
    let args = match shell_words::split(command) {
        Ok(args) => args,
        Err(e) => return ConsoleReply::text(format!("Error parsing command: {e}")),
    };

    let matches = match console_command().try_get_matches_from(args) {
        Ok(matches) => matches,
        Err(e) => return ConsoleReply::text(e.to_string().trim_end().to_string()),
    };

    match matches.subcommand() {
        Some(("load", sub)) => {
            let n = sub.get_one::<u32>("n").copied().unwrap_or(1) as usize;
            match catalog.get(n - 1) {
                Some(entry) => ConsoleReply {
                    text: format!("Loading {}", entry.label),
                    action: Some(GuiAction::LoadLevel(n - 1)),
                },
                None => ConsoleReply::text(format!("No level {n}, there are {}", catalog.len())),
            }
        }
        Some(("reload", _)) => match status.current {
            Some(_) => ConsoleReply {
                text: format!("Reloading {}", status.name),
                action: Some(GuiAction::Reload),
            },
            None => ConsoleReply::text("No level is loaded"),
        },
        Some(("levels", _)) => {
            if catalog.is_empty() {
                return ConsoleReply::text("No levels found");
            }
            let lines: Vec<String> = catalog
                .entries()
                .iter()
                .enumerate()
                .map(|(i, entry)| {
                    let marker = if status.current == Some(i) { "*" } else { " " };
                    format!("{marker}{} {}", i + 1, entry.label)
                })
                .collect();
            ConsoleReply::text(lines.join("\n"))
        }
        Some(("stats", _)) => ConsoleReply::text(status.describe()),
        Some(("echo", sub)) => {
            let text: Vec<&str> = sub
                .get_many::<String>("text")
                .into_iter()
                .flatten()
                .map(|s| s.as_str())
                .collect();
            ConsoleReply::text(text.join(" "))
        }
        _ => ConsoleReply::text("Unknown command or syntax error"),
    }
}

pub struct Gui {
    visible: bool,

    console_input: String,
    console_lines: VecDeque<String>,
    max_console_lines: usize,

    frame_count: u32,
    accumulator: Duration,
    last_frame_time: Instant,
    fps: u32,
}

impl Default for Gui {
    fn default() -> Self {
        Self::new()
    }
}

impl Gui {
    pub fn new() -> Self {
        Self {
            visible: true,
            console_input: String::new(),
            console_lines: VecDeque::new(),
            max_console_lines: 100,
            frame_count: 0,
            accumulator: Duration::ZERO,
            last_frame_time: Instant::now(),
            fps: 0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn console_lines(&self) -> impl Iterator<Item = &str> {
        self.console_lines.iter().map(String::as_str)
    }

    pub fn append_console(&mut self, text: impl Into<String>) {
        for line in text.into().lines() {
            self.console_lines.push_back(line.to_string());
        }
        while self.console_lines.len() > self.max_console_lines {
            self.console_lines.pop_front();
        }
    }

    /// Echoes `command`, runs it and prints the reply.
    pub fn submit_command(
        &mut self,
        command: &str,
        catalog: &LevelCatalog,
        status: &LevelStatus,
    ) -> Option<GuiAction> {
        let command = command.trim();
        if command.is_empty() {
            return None;
        }
        self.append_console(format!("> {command}"));
        let reply = process_console_command(command, catalog, status);
        self.append_console(reply.text);
        reply.action
    }

    fn tick_fps(&mut self) {
        let now = Instant::now();
        let dt = now - self.last_frame_time;
        self.last_frame_time = now;

        self.accumulator += dt;
        self.frame_count += 1;

        // Refresh the indicator every 0.1 seconds
        if self.accumulator >= Duration::from_secs_f32(0.1) {
            self.fps = (self.frame_count as f32 / self.accumulator.as_secs_f32()) as u32;
            self.accumulator = Duration::ZERO;
            self.frame_count = 0;
        }
    }

    pub fn update(
        &mut self,
        raw_input: egui::RawInput,
        ctx: &egui::Context,
        catalog: &LevelCatalog,
        status: &LevelStatus,
    ) -> (egui::FullOutput, Vec<GuiAction>) {
        self.tick_fps();

        let mut actions = Vec::new();
        let output = ctx.run(raw_input, |ctx| {
            if !self.visible {
                return;
            }

            egui::SidePanel::left("Levels")
                .min_width(160.0)
                .resizable(true)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.heading("Levels");
                        ui.allocate_ui_with_layout(
                            ui.available_size(),
                            Layout::right_to_left(Align::Center),
                            |ui| {
                                ui.label(format!("FPS: {}", self.fps));
                            },
                        );
                    });
                    ui.separator();

                    for (i, entry) in catalog.entries().iter().enumerate() {
                        let label = format!("{} {}", i + 1, entry.label);
                        if ui.selectable_label(status.current == Some(i), label).clicked() {
                            actions.push(GuiAction::LoadLevel(i));
                        }
                    }

                    ui.separator();
                    let reload =
                        ui.add_enabled(status.current.is_some(), egui::Button::new("Reload"));
                    if reload.clicked() {
                        actions.push(GuiAction::Reload);
                    }

                    ui.separator();
                    ui.label(format!("Level: {}", status.name));
                    ui.label(format!("Instances: {}", status.instances));
                    ui.label(format!("Skipped: {}", status.load.skipped()));
                    ui.label(format!("Lights ignored: {}", status.load.lights));
                    if status.upload.failed > 0 {
                        ui.colored_label(
                            egui::Color32::LIGHT_RED,
                            format!("Upload failures: {}", status.upload.failed),
                        );
                    }
                });

            egui::TopBottomPanel::bottom("Console")
                .min_height(105.0)
                .resizable(true)
                .show(ctx, |ui| {
                    use egui::{Key, ScrollArea, TextEdit};

                    ScrollArea::vertical()
                        .max_height(100.0)
                        .auto_shrink([false; 2])
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            ui.set_min_width(ui.available_width());
                            for line in &self.console_lines {
                                ui.monospace(line);
                            }
                        });

                    let input = TextEdit::singleline(&mut self.console_input)
                        .hint_text("Enter command");
                    let enter_pressed = ui.add(input).lost_focus()
                        && ui.input(|i| i.key_pressed(Key::Enter));

                    if enter_pressed {
                        let command = std::mem::take(&mut self.console_input);
                        if let Some(action) = self.submit_command(&command, catalog, status) {
                            actions.push(action);
                        }
                    }

                    // To allow for resizing
                    ui.allocate_space(ui.available_size());
                });
        });

        (output, actions)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::LevelEntry;

    fn catalog() -> LevelCatalog {
        LevelCatalog::from_entries(
            ["Level_1", "Level_2"]
                .iter()
                .map(|label| LevelEntry {
                    label: label.to_string(),
                    description: PathBuf::from(label).join("GameLevel.txt"),
                    models: PathBuf::from(label).join("Models"),
                })
                .collect(),
        )
    }

    fn loaded() -> LevelStatus {
        LevelStatus {
            current: Some(0),
            name: "Level_1".into(),
            instances: 4,
            ..Default::default()
        }
    }

    #[test]
    fn load_is_one_based() {
        let reply = process_console_command("load 2", &catalog(), &loaded());
        assert_eq!(reply.action, Some(GuiAction::LoadLevel(1)));
    }

    #[test]
    fn load_out_of_range() {
        let reply = process_console_command("load 3", &catalog(), &loaded());
        assert_eq!(reply.action, None);
        assert!(reply.text.contains("No level 3"));

        assert_eq!(process_console_command("load 0", &catalog(), &loaded()).action, None);
        assert_eq!(process_console_command("load x", &catalog(), &loaded()).action, None);
    }

    #[test]
    fn reload_needs_a_level() {
        assert_eq!(
            process_console_command("reload", &catalog(), &loaded()).action,
            Some(GuiAction::Reload)
        );
        assert_eq!(
            process_console_command("reload", &catalog(), &LevelStatus::default()).action,
            None
        );
    }

    #[test]
    fn levels_marks_current() {
        let reply = process_console_command("levels", &catalog(), &loaded());
        assert_eq!(reply.text, "*1 Level_1\n 2 Level_2");
    }

    #[test]
    fn echo_keeps_quoted_words() {
        let reply = process_console_command("echo \"hello there\" world", &catalog(), &loaded());
        assert_eq!(reply.text, "hello there world");
    }

    #[test]
    fn unknown_and_unbalanced_input() {
        assert_eq!(process_console_command("fly", &catalog(), &loaded()).action, None);
        let reply = process_console_command("echo \"open", &catalog(), &loaded());
        assert!(reply.text.starts_with("Error parsing command"));
    }

    #[test]
    fn console_keeps_a_bounded_history() {
        let mut gui = Gui::new();
        for i in 0..150 {
            gui.append_console(format!("line {i}"));
        }
        assert_eq!(gui.console_lines().count(), 100);
        assert_eq!(gui.console_lines().next(), Some("line 50"));
    }

    #[test]
    fn overlay_starts_shown_and_toggles() {
        let mut gui = Gui::new();
        assert!(gui.is_visible());
        gui.toggle();
        assert!(!gui.is_visible());
        gui.toggle();
        assert!(gui.is_visible());
    }

    #[test]
    fn submit_echoes_and_returns_action() {
        let mut gui = Gui::new();
        let action = gui.submit_command("  load 1 ", &catalog(), &loaded());
        assert_eq!(action, Some(GuiAction::LoadLevel(0)));
        let lines: Vec<_> = gui.console_lines().collect();
        assert_eq!(lines, ["> load 1", "Loading Level_1"]);
        assert_eq!(gui.submit_command("   ", &catalog(), &loaded()), None);
    }
}
