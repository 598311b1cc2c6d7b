use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use peekgrid::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "peekgrid", version, about = "Browse nested values as a grid of tables (show/dump)")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Interactive grid over the given values
    Show {
        #[command(flatten)]
        sources: Sources,
        /// Log file (the terminal is owned by the grid while it runs)
        #[arg(long, default_value = "peekgrid.log")]
        log: PathBuf,
    },

    /// Write a JSON snapshot of one render
    Dump {
        #[command(flatten)]
        sources: Sources,
        /// Output file (default: `dump_file` from the options)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct Sources {
    /// JSON files; each is registered under its file stem
    files: Vec<PathBuf>,
    /// Register a built-in value that keeps changing while it is shown
    #[arg(long)]
    demo: bool,
    /// Open a cell for a dotted path starting with a root label (repeatable)
    #[arg(long = "follow", value_name = "PATH")]
    follow: Vec<String>,
    /// Explorer options as JSON (missing keys keep their defaults)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Show { sources, log } => {
            init_logging(Some(log.as_path()))?;
            let explorer = build_explorer(&sources)?;
            let mut state = ShowState::new(explorer);
            run_show_tui(&mut state)
        }
        Cmd::Dump { sources, out } => {
            init_logging(None)?;
            let explorer = build_explorer(&sources)?;
            let path = explorer.dump(out.as_deref()).context("failed to write dump")?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn init_logging(log: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow!(e))?;
            // Recovered preview panics would otherwise print over the grid.
            std::panic::set_hook(Box::new(|info| {
                tracing::debug!(panic = %info, "panic");
            }));
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!(e))?;
        }
    }
    Ok(())
}

fn build_explorer(sources: &Sources) -> Result<Arc<Explorer>> {
    let options = match &sources.config {
        Some(path) => ExploreOptions::from_json_file(path)
            .with_context(|| format!("failed to read options from {}", path.display()))?,
        None => ExploreOptions::default(),
    };
    let explorer = Arc::new(Explorer::new(options));

    for file in &sources.files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON in {}", file.display()))?;
        let label = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        if !explorer.register(&label, value)? {
            tracing::warn!(file = %file.display(), "nothing to explore in file");
        }
    }

    if sources.demo {
        let inventory = demo::inventory();
        demo::spawn_ticker(Arc::clone(&inventory));
        explorer.register_shared("inventory", inventory)?;
        explorer.register("limits", demo::limits())?;
    }

    if explorer.root_labels().is_empty() {
        bail!("nothing to explore: pass JSON files or --demo");
    }

    for path in &sources.follow {
        if explorer.follow_path(path, None)?.is_none() {
            tracing::warn!(path = %path, "no root for path");
        }
    }

    tracing::info!(roots = ?explorer.root_labels(), "explorer ready");
    Ok(explorer)
}

mod demo {
    use std::collections::{BTreeMap, HashMap};
    use std::fmt;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::RwLock;
    use peekgrid::{inspect_display, inspect_struct};

    pub struct Inventory {
        name: String,
        ticks: u64,
        note: String,
        items: Vec<Item>,
        by_sku: HashMap<String, Item>,
        by_bin: HashMap<(i32, i32), String>,
        owner: Option<Box<Owner>>,
        flaky: Flaky,
    }
    inspect_struct!(Inventory { name, ticks, note, items, by_sku, by_bin, owner, flaky });

    #[derive(Clone)]
    struct Item {
        sku: String,
        qty: u32,
        price: f64,
        tags: Vec<String>,
        discontinued: bool,
    }
    inspect_struct!(Item { sku, qty, price, tags, discontinued });

    struct Owner {
        name: String,
        email: Option<String>,
    }
    inspect_struct!(Owner { name, email });

    /// Value whose `Display` always fails.
    struct Flaky;

    impl fmt::Display for Flaky {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("flaky display")
        }
    }
    inspect_display!(Flaky);

    pub fn inventory() -> Arc<RwLock<Inventory>> {
        let items: Vec<Item> = (0..120)
            .map(|i| Item {
                sku: format!("SKU-{i:04}"),
                qty: (i * 7 % 13) as u32,
                price: 1.25 * i as f64,
                tags: if i % 3 == 0 { vec!["bulk".to_string()] } else { Vec::new() },
                discontinued: i % 11 == 0,
            })
            .collect();
        let by_sku = items
            .iter()
            .take(8)
            .map(|item| (item.sku.clone(), item.clone()))
            .collect();
        let by_bin = [((0, 1), "bolts"), ((2, 3), "nuts"), ((4, 0), "washers.m8")]
            .into_iter()
            .map(|(bin, what)| (bin, what.to_string()))
            .collect();
        Arc::new(RwLock::new(Inventory {
            name: "main warehouse".to_string(),
            ticks: 0,
            note: String::new(),
            items,
            by_sku,
            by_bin,
            owner: Some(Box::new(Owner {
                name: "ops".to_string(),
                email: None,
            })),
            flaky: Flaky,
        }))
    }

    pub fn limits() -> BTreeMap<String, u64> {
        [("max_items", 10_000), ("max_bins", 64), ("reserved", 0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    pub fn spawn_ticker(inventory: Arc<RwLock<Inventory>>) {
        std::thread::spawn(move || loop {
            std::thread::sleep(Duration::from_millis(500));
            let mut inv = inventory.write();
            inv.ticks += 1;
            let n = inv.items.len();
            let at = (inv.ticks as usize) % n;
            inv.items[at].qty = inv.items[at].qty.wrapping_add(1);
        });
    }
}

//
// ===== Interactive grid =====
//

const REFRESH_EVERY: Duration = Duration::from_millis(1000);

struct ShowState {
    explorer: Arc<Explorer>,
    data: IndexData,
    last_refresh: Instant,

    // Focused cell and the member selected in it.
    focus: (usize, usize),
    selected: usize,
    marked: BTreeSet<String>,

    status: String,
}

impl ShowState {
    fn new(explorer: Arc<Explorer>) -> Self {
        let data = explorer.render();
        let mut state = Self {
            explorer,
            data,
            last_refresh: Instant::now(),
            focus: (0, 0),
            selected: 0,
            marked: BTreeSet::new(),
            status: "arrows cell  j/k member  space mark  enter/d down  l right  u up  x remove  z zeros  c clear  w dump  q quit"
                .to_string(),
        };
        state.fix_focus();
        state
    }

    fn refresh(&mut self) {
        self.data = self.explorer.render();
        self.last_refresh = Instant::now();
        self.fix_focus();
    }

    fn focused(&self) -> Option<&FieldList> {
        self.data.cell(self.focus.0, self.focus.1)
    }

    fn fix_focus(&mut self) {
        if self.focused().is_none() {
            self.focus = self
                .data
                .cells()
                .next()
                .map(|c| (c.row, c.column))
                .unwrap_or((0, 0));
            self.selected = 0;
            self.marked.clear();
        }
        let size = self.focused().map(|c| c.select_size).unwrap_or(0);
        self.selected = self.selected.min(size.saturating_sub(1));
    }

    fn set_focus(&mut self, to: (usize, usize)) {
        if to != self.focus {
            self.focus = to;
            self.selected = 0;
            self.marked.clear();
        }
    }

    /// Move to the nearest occupied cell in a direction.
    fn move_focus(&mut self, drow: i32, dcol: i32) {
        let (row, column) = self.focus;
        let candidates = self.data.cells().map(|c| (c.row, c.column)).filter(|&(r, c)| {
            match (drow.signum(), dcol.signum()) {
                (0, 1) => r == row && c > column,
                (0, -1) => r == row && c < column,
                (1, _) => r > row,
                (-1, _) => r < row,
                _ => false,
            }
        });
        let next = candidates.min_by_key(|&(r, c)| (r.abs_diff(row), c.abs_diff(column)));
        if let Some(to) = next {
            self.set_focus(to);
        }
    }

    fn move_sel(&mut self, delta: i32) {
        let size = self.focused().map(|c| c.select_size).unwrap_or(0);
        if size == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as i64 + delta as i64).clamp(0, size as i64 - 1);
        self.selected = next as usize;
    }

    fn toggle_mark(&mut self) {
        let Some(key) = self.selected_key() else {
            return;
        };
        if !self.marked.remove(&key) {
            self.marked.insert(key);
        }
    }

    fn selected_key(&self) -> Option<String> {
        self.focused()?.fields.get(self.selected).map(|f| f.key.clone())
    }

    fn selections(&self) -> Vec<String> {
        if self.marked.is_empty() {
            self.selected_key().into_iter().collect()
        } else {
            self.marked.iter().cloned().collect()
        }
    }

    fn apply(&mut self, action: Action) {
        let instruction = Instruction {
            row: self.focus.0,
            column: self.focus.1,
            selections: self.selections(),
            action: action.as_str().to_string(),
        };
        self.status = match self.explorer.apply(&instruction) {
            Ok(placed) if placed.is_empty() => action.as_str().to_string(),
            Ok(placed) => format!("{}: opened {} cell(s)", action.as_str(), placed.len()),
            Err(e) => {
                tracing::warn!(error = %e, "instruction failed");
                format!("error: {e}")
            }
        };
        self.marked.clear();
        self.refresh();
    }

    fn dump(&mut self) {
        self.status = match self.explorer.dump(None) {
            Ok(path) => format!("dump written to {}", path.display()),
            Err(e) => format!("dump failed: {e}"),
        };
    }
}

fn clamp_scroll(scroll: u16, content_len: usize, viewport_h: u16) -> u16 {
    if viewport_h == 0 {
        return 0;
    }
    let content_len = content_len as u16;
    if content_len <= viewport_h {
        return 0;
    }
    let max_scroll = content_len.saturating_sub(viewport_h);
    scroll.min(max_scroll)
}

fn ensure_visible(scroll: u16, sel: u16, viewport_h: u16) -> u16 {
    if viewport_h == 0 {
        return scroll;
    }
    let top = scroll;
    let bottom = scroll.saturating_add(viewport_h.saturating_sub(1));
    if sel < top {
        sel
    } else if sel > bottom {
        sel.saturating_sub(viewport_h.saturating_sub(1))
    } else {
        scroll
    }
}

fn run_show_tui(state: &mut ShowState) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut term = Terminal::new(backend)?;

    let res = (|| -> Result<()> {
        loop {
            if state.last_refresh.elapsed() >= REFRESH_EVERY {
                state.refresh();
            }
            term.draw(|f| draw_show_ui(f, state))?;

            if event::poll(Duration::from_millis(120))? {
                if let Event::Key(KeyEvent { code, modifiers, .. }) = event::read()? {
                    // Ctrl+C exits too
                    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
                        break;
                    }

                    match code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Up => state.move_focus(-1, 0),
                        KeyCode::Down => state.move_focus(1, 0),
                        KeyCode::Left => state.move_focus(0, -1),
                        KeyCode::Right => state.move_focus(0, 1),
                        KeyCode::Char('k') => state.move_sel(-1),
                        KeyCode::Char('j') => state.move_sel(1),
                        KeyCode::PageUp => state.move_sel(-10),
                        KeyCode::PageDown => state.move_sel(10),
                        KeyCode::Char(' ') => state.toggle_mark(),
                        KeyCode::Enter | KeyCode::Char('d') => state.apply(Action::Down),
                        KeyCode::Char('l') => state.apply(Action::Right),
                        KeyCode::Char('u') => state.apply(Action::Up),
                        KeyCode::Char('x') => state.apply(Action::Remove),
                        KeyCode::Char('z') => state.apply(Action::ToggleZeros),
                        KeyCode::Char('c') => state.apply(Action::Clear),
                        KeyCode::Char('w') => state.dump(),
                        KeyCode::Char('r') => state.refresh(),
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    })();

    disable_raw_mode()?;
    execute!(term.backend_mut(), LeaveAlternateScreen)?;
    term.show_cursor()?;

    res
}

fn draw_show_ui(f: &mut ratatui::Frame<'_>, state: &ShowState) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(size);

    draw_grid(f, chunks[0], state);

    let status = Paragraph::new(Line::from(Span::styled(
        state.status.clone(),
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(status, chunks[1]);
}

fn draw_grid(f: &mut ratatui::Frame<'_>, area: Rect, state: &ShowState) {
    let rows: Vec<&TableRow> = state.data.rows.iter().filter(|r| !r.cells.is_empty()).collect();
    if rows.is_empty() {
        f.render_widget(Paragraph::new("No cells."), area);
        return;
    }
    let columns = rows.iter().map(|r| r.cells.len()).max().unwrap_or(1) as u32;

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows.len() as u32); rows.len()])
        .split(area);

    for (row, row_area) in rows.iter().zip(row_areas.iter()) {
        let cell_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns); columns as usize])
            .split(*row_area);
        for (cell, cell_area) in row.cells.iter().zip(cell_areas.iter()) {
            if let Some(cell) = cell {
                draw_cell(f, *cell_area, cell, state);
            }
        }
    }
}

fn draw_cell(f: &mut ratatui::Frame<'_>, area: Rect, cell: &FieldList, state: &ShowState) {
    let focused = (cell.row, cell.column) == state.focus;

    let mut title = format!("{}{}  {}", cell.label, " ".repeat(cell.label_padding), cell.type_name);
    if let Some(range) = &cell.range {
        title.push_str(&format!("  [{range}]"));
    }
    if cell.hide_zeros && cell.has_zeros {
        title.push_str("  (zeros hidden)");
    }

    let border_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else if cell.is_root {
        Style::default().fg(Color::Blue)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let mut lines: Vec<Line> = vec![];
    for (i, field) in cell.fields.iter().enumerate() {
        let selected = focused && i == state.selected;
        let marked = focused && state.marked.contains(&field.key);

        let name_style = if selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        };

        lines.push(Line::from(vec![
            Span::styled(if marked { "+ " } else { "  " }, Style::default().fg(Color::Magenta)),
            Span::styled(field.label.clone(), name_style),
            Span::raw(" ".repeat(field.padding)),
            Span::raw(": "),
            Span::styled(field.value_string.clone(), Style::default().fg(Color::Green)),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "<no members>",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let inner_h = area.height.saturating_sub(2);
    let scroll = if focused {
        ensure_visible(0, state.selected as u16, inner_h)
    } else {
        0
    };
    let scroll = clamp_scroll(scroll, lines.len(), inner_h);

    let paragraph = Paragraph::new(lines).block(block).scroll((scroll, 0));
    f.render_widget(paragraph, area);
}
