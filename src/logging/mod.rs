use std::{
    env,
    fmt::Write as _,
    sync::Mutex,
    thread,
    time::Duration,
};

use chrono::{format::DelayedFormat, DateTime, Local};
use crossbeam_channel::{bounded, unbounded, Sender};
use once_cell::sync::Lazy;

use crate::logging::rotate::Rotate;

pub mod rotate;

const LOG_CONSOLE: &str = "LOG_CONSOLE";

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

/// 所有 Logger 的寫入端，供 `flush` 在程式結束前把緩衝區寫進檔案
static WRITERS: Lazy<Mutex<Vec<Sender<Command>>>> = Lazy::new(Default::default);

#[derive(Debug, Copy, Clone, PartialEq, Eq, strum::Display)]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

pub struct LogMessage {
    pub level: Level,
    pub msg: String,
    pub created_at: DateTime<Local>,
}

impl LogMessage {
    pub fn new(level: Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

enum Command {
    Write(LogMessage),
    Flush(Sender<()>),
}

pub struct Logger {
    writer: Sender<Command>,
    console: bool,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let (tx, rx) = unbounded::<Command>();
        let fn_pattern = format!("log/%Y-%m-%d-{}.log", log_name);

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = Rotate::new(fn_pattern);
            let mut together = String::with_capacity(4096);

            for command in &rx {
                match command {
                    Command::Write(received) => {
                        if writeln!(
                            &mut together,
                            "{} {} {}",
                            received.created_at.format("%F %X%.6f"),
                            received.level,
                            received.msg
                        )
                        .is_err()
                        {
                            continue;
                        }

                        if rx.is_empty() || together.len() >= 4096 {
                            Self::write_out(&mut rotate, &mut together);
                        }
                    }
                    Command::Flush(done) => {
                        Self::write_out(&mut rotate, &mut together);
                        let _ = done.send(());
                    }
                }
            }
        });

        if let Ok(mut writers) = WRITERS.lock() {
            writers.push(tx.clone());
        }

        Logger {
            writer: tx,
            console: console_enabled(),
        }
    }

    fn write_out(rotate: &mut Rotate, together: &mut String) {
        if together.is_empty() {
            return;
        }

        if let Err(why) = rotate.write_msg(Local::now(), together.as_bytes()) {
            error_console(format!("Failed to write log because {:?}", why));
            info_console(together.clone());
        }

        rotate.flush();
        together.clear();
    }

    pub fn info(&self, log: String) {
        self.send(Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(Level::Error, log);
    }

    pub fn debug(&self, log: String) {
        self.send(Level::Debug, log);
    }

    fn send(&self, level: Level, msg: String) {
        if self.console && level != Level::Debug {
            console(level, &msg);
        }

        if let Err(why) = self.writer.send(Command::Write(LogMessage::new(level, msg))) {
            error_console(why.to_string());
        }
    }
}

/// 預設開啟；`LOG_CONSOLE=false` 時只寫檔
fn console_enabled() -> bool {
    env::var(LOG_CONSOLE)
        .map(|v| !v.trim().eq_ignore_ascii_case("false"))
        .unwrap_or(true)
}

/// 等待所有 Logger 把已送出的訊息寫進檔案
pub fn flush() {
    let writers = match WRITERS.lock() {
        Ok(writers) => writers.clone(),
        Err(_) => return,
    };

    for writer in writers {
        let (done_tx, done_rx) = bounded::<()>(1);
        if writer.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv_timeout(Duration::from_secs(5));
        }
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

fn console(level: Level, log: &str) {
    println!(
        "{} {} {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        level,
        log
    );
}

pub fn info_console(log: String) {
    console(Level::Info, &log);
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
