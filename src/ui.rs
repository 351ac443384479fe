use std::io::{self, IsTerminal};

use crate::roamdb::{Block, Page};

pub fn print_page(page: &Page) {
    for line in page_lines(page, &Palette::auto()) {
        println!("{line}");
    }
}

pub fn print_block(block: &Block) {
    let palette = Palette::auto();
    let mut lines = Vec::new();
    push_block(&mut lines, block, 0, &palette);
    for line in lines {
        println!("{line}");
    }
}

fn page_lines(page: &Page, palette: &Palette) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({})",
        palette.heading(&page.title),
        palette.id(&page.uid)
    )];
    if page.children.is_empty() {
        lines.push(palette.dim("  (empty page)"));
    }
    for block in &page.children {
        push_block(&mut lines, block, 1, palette);
    }
    lines
}

fn push_block(lines: &mut Vec<String>, block: &Block, depth: usize, palette: &Palette) {
    let indent = "  ".repeat(depth);
    let text = match block.heading {
        Some(level) if level > 0 => palette.heading(&block.string),
        _ => block.string.clone(),
    };
    lines.push(format!(
        "{indent}- {text} {}",
        palette.dim(&format!("(({}))", block.uid))
    ));
    for child in &block.children {
        push_block(lines, child, depth + 1, palette);
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }
}
