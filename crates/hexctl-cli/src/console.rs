//! Operator console – a line-oriented shell over the supervisor.
//!
//! Commands:
//!   forward | backward | strafe-left | strafe-right | turn-left |
//!   turn-right | raise | lower | tabletop-pose | reset-pose
//!   height <z>        – absolute body height (clamped)
//!   height +N | -N    – relative body height (clamped)
//!   stop              – engage the soft emergency stop
//!   pt <rig> <action> [step]
//!   led <mode> [r g b]
//!   beep [pulse|on|off]
//!   preset <demo1|demo2|demo3>
//!   sensors | status | journal
//!   quit | exit

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use hexctl_core::Supervisor;
use hexctl_hal::sim::CallJournal;
use hexctl_types::{ControlError, ControlReply, Rgb};

/// Entry point for the console loop. `shutdown` is polled each iteration;
/// when set the loop exits cleanly.
pub fn run(shutdown: Arc<AtomicBool>, sup: Arc<Supervisor>, journal: CallJournal) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "hexctl>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = words.first() else {
            continue;
        };

        match command {
            "help" => cmd_help(),
            "quit" | "exit" => {
                println!("{}", "Relaxing servos and exiting.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            "stop" | "x" => print_reply(&sup.stop_all()),
            "height" => cmd_height(&sup, &words),
            "pt" => cmd_pan_tilt(&sup, &words),
            "led" => cmd_led(&sup, &words),
            "beep" => cmd_beep(&sup, &words),
            "preset" => cmd_preset(&sup, &words),
            "sensors" => cmd_sensors(&sup),
            "status" => print_snapshot(&sup),
            "journal" => cmd_journal(&journal),
            name => match sup.set_command_by_name(name) {
                Ok(reply) => print_reply(&reply),
                Err(e) => print_error(&e),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "hexctl commands".bold().underline());
    println!(
        "  {}",
        "forward backward strafe-left strafe-right turn-left turn-right".bold()
    );
    println!("  {}", "raise lower tabletop-pose reset-pose".bold());
    println!("  {}   absolute body height, {} relative", "height <z>".cyan(), "height +N/-N".cyan());
    println!("  {}         soft emergency stop (any motion command resumes)", "stop".cyan());
    println!("  {}  aim a rig, e.g. pt phone pan-left 5", "pt <rig> <action> [step]".cyan());
    println!("  {}     off solid blink breathe police rainbow", "led <mode> [r g b]".cyan());
    println!("  {}      pulse / on / off", "beep [mode]".cyan());
    println!("  {}   demo1 demo2 demo3", "preset <name>".cyan());
    println!("  {}  {}  {}", "sensors".cyan(), "status".cyan(), "journal".cyan());
    println!("  {}", "quit".cyan());
    println!();
}

fn cmd_height(sup: &Supervisor, words: &[&str]) {
    let Some(arg) = words.get(1) else {
        println!("{}", "Usage: height <z> | height +N | height -N".yellow());
        return;
    };
    let relative = arg.starts_with('+') || arg.starts_with('-');
    match arg.parse::<i32>() {
        Ok(value) if relative => print_reply(&sup.set_height_relative(value)),
        Ok(value) => print_reply(&sup.set_height_absolute(value)),
        Err(_) => println!("{} '{}'", "Not a number:".red(), arg),
    }
}

fn cmd_pan_tilt(sup: &Supervisor, words: &[&str]) {
    let (Some(rig), Some(action)) = (words.get(1), words.get(2)) else {
        println!("{}", "Usage: pt <phone|head> <action> [step]".yellow());
        return;
    };
    let step = words.get(3).and_then(|s| s.parse().ok());
    let result = rig
        .parse()
        .and_then(|rig| action.parse().map(|action| (rig, action)))
        .and_then(|(rig, action)| sup.pan_tilt(rig, action, step));
    match result {
        Ok(reply) => print_reply(&reply),
        Err(e) => print_error(&e),
    }
}

fn cmd_led(sup: &Supervisor, words: &[&str]) {
    let Some(mode) = words.get(1) else {
        println!("{}", "Usage: led <mode> [r g b]".yellow());
        return;
    };
    let channel = |i: usize| {
        words
            .get(i)
            .and_then(|s| s.parse::<u8>().ok())
            .unwrap_or(0)
    };
    let color = Rgb::new(channel(2), channel(3), channel(4));
    match mode.parse() {
        Ok(mode) => print_reply(&sup.trigger_led(mode, color)),
        Err(e) => print_error(&e),
    }
}

fn cmd_beep(sup: &Supervisor, words: &[&str]) {
    let mode = words.get(1).copied().unwrap_or("pulse");
    match mode.parse() {
        Ok(mode) => print_reply(&sup.trigger_buzzer(mode)),
        Err(e) => print_error(&e),
    }
}

fn cmd_preset(sup: &Supervisor, words: &[&str]) {
    let Some(name) = words.get(1) else {
        println!("{}", "Usage: preset <demo1|demo2|demo3>".yellow());
        return;
    };
    match name.parse() {
        Ok(name) => print_reply(&sup.trigger_preset(name)),
        Err(e) => print_error(&e),
    }
}

fn cmd_sensors(sup: &Supervisor) {
    let report = sup.read_sensors();
    match &report.battery {
        Ok(b) => println!("  Battery    {:.2} V  {:?}", b.volts, b.status),
        Err(e) => println!("  Battery    {}", e.red()),
    }
    match &report.distance {
        Ok(d) => println!("  Ultrasonic {:.1} cm  {:?}", d.centimeters, d.status),
        Err(e) => println!("  Ultrasonic {}", e.red()),
    }
}

fn cmd_journal(journal: &CallJournal) {
    let calls = journal.take();
    if calls.is_empty() {
        println!("  (no hardware calls since last dump)");
        return;
    }
    for call in calls {
        println!("  {:?}", call);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output helpers
// ─────────────────────────────────────────────────────────────────────────────

fn print_reply(reply: &ControlReply) {
    let snap = &reply.snapshot;
    let stop = if snap.stop_engaged {
        "STOPPED".red().bold().to_string()
    } else {
        "ok".green().to_string()
    };
    println!(
        "  {}  [z={} phone={}/{} head={}/{} {}]",
        reply.status.bold(),
        snap.body_z,
        snap.phone_pan,
        snap.phone_tilt,
        snap.head_pan,
        snap.head_tilt,
        stop
    );
}

fn print_snapshot(sup: &Supervisor) {
    let snap = sup.snapshot();
    println!("  body_z        {}", snap.body_z);
    println!("  phone rig     pan={} tilt={}", snap.phone_pan, snap.phone_tilt);
    println!("  head rig      pan={} tilt={}", snap.head_pan, snap.head_tilt);
    println!("  stop engaged  {}", snap.stop_engaged);
    println!(
        "  active preset {}",
        snap.active_preset
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  pending cmd   {}",
        snap.pending_command
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  led color     ({},{},{})",
        snap.led_last_color.r, snap.led_last_color.g, snap.led_last_color.b
    );
}

fn print_error(err: &ControlError) {
    println!("  {} {}", "Rejected:".red(), err);
}
