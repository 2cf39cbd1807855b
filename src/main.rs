mod config;
mod controller;
mod error;
mod models;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, config_path, load_config};
use crate::controller::{EchoReplies, ViewStateController};
use crate::error::AppError;
use crate::ui::{App, render};

/// 获取数据目录路径 (~/.local/share/solace/)
fn get_data_dir() -> io::Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "cannot locate user data dir"))?
        .join("solace");

    fs::create_dir_all(&data_dir)?;

    Ok(data_dir)
}

/// 日志写入文件，终端留给界面 (SOLACE_LOG 控制级别)
fn init_logging(data_dir: &Path) -> Result<(), AppError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("solace.log"))?;
    let filter = EnvFilter::try_from_env("SOLACE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}

fn main() -> Result<(), AppError> {
    let data_dir = get_data_dir()?;
    init_logging(&data_dir)?;

    // 加载配置
    let config = match config_path() {
        Some(path) => load_config(&path)?,
        None => Config::default(),
    };
    let history = config.history_entries()?;

    // 创建应用状态
    let controller = ViewStateController::new(
        config.companions.clone(),
        config.timing,
        Box::new(EchoReplies),
    )
    .with_theme(config.appearance.theme)
    .with_history(history);
    let mut app = App::new(controller);

    // 设置终端
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("session started");
    app.controller.start(Instant::now());

    // 主循环
    let result = run_app(&mut terminal, &mut app);
    app.controller.dispose();

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result.map_err(AppError::from)
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let frame = app.controller.timing().frame();
    loop {
        let now = Instant::now();
        app.controller.tick(now);

        if app.take_redraw() {
            terminal.draw(|f| render(f, app, now))?;
        }

        // 最多睡到下一个定时器到期
        let timeout = app
            .controller
            .next_deadline()
            .map_or(frame, |deadline| {
                deadline.saturating_duration_since(Instant::now()).min(frame)
            });

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if ui::handle_key_event(app, key, Instant::now())? {
                        break;
                    }
                }
                Event::Resize(_, _) => app.mark_dirty(),
                _ => {}
            }
        }
    }
    Ok(())
}
