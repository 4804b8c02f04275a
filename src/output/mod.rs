//! Model and status printing through configurable templates. Templates may
//! contain `#` (the running counter) and `\n` escapes; `v` lines of the
//! input either override a template or attach a display string to a literal.

use crate::basic_types::Literal;
use crate::basic_types::TruthValue;
use crate::parse::ParseError;

/// The printable templates, keyed the way the input format names them.
#[derive(Clone, Debug)]
pub struct OutputTemplates {
    pub iterations_start: String,
    pub iterations_end: String,
    pub iteration_start: String,
    pub iteration_sep: String,
    pub iteration_end: String,
    pub models_unknown: String,
    pub models_none: String,
    pub models_start: String,
    pub models_end: String,
    pub model_start: String,
    pub model_sep: String,
    pub model_end: String,
    pub lit_start: String,
    pub lit_sep: String,
    pub lit_end: String,
}

impl Default for OutputTemplates {
    /// DIMACS-style defaults: `s`/`v` lines with a model-counter comment.
    fn default() -> Self {
        OutputTemplates {
            iterations_start: String::new(),
            iterations_end: String::new(),
            iteration_start: String::new(),
            iteration_sep: String::new(),
            iteration_end: String::new(),
            models_unknown: "s UNKNOWN\\n".to_owned(),
            models_none: "s UNSATISFIABLE\\n".to_owned(),
            models_start: "s SATISFIABLE\\n".to_owned(),
            models_end: String::new(),
            model_start: "c Model #\\nv ".to_owned(),
            model_sep: String::new(),
            model_end: "\\n".to_owned(),
            lit_start: String::new(),
            lit_sep: " ".to_owned(),
            lit_end: String::new(),
        }
    }
}

#[derive(Clone, Debug)]
struct VisibleLiteral {
    literal: Literal,
    text: String,
}

/// Publishes models and solve outcomes. Without visible literals the model
/// is printed in DIMACS form, truncated to the visible-variable bound; with
/// visible literals their display strings are printed instead.
#[derive(Clone, Debug)]
pub struct Printer {
    templates: OutputTemplates,
    visible: Vec<VisibleLiteral>,
    last_visible_var: usize,
    no_ids: bool,
    print_model: bool,
    model_count: u64,
    iteration_count: u64,
}

impl Printer {
    pub fn new(templates: OutputTemplates, print_model: bool) -> Printer {
        Printer {
            templates,
            visible: Vec::new(),
            last_visible_var: usize::MAX,
            no_ids: false,
            print_model,
            model_count: 0,
            iteration_count: 0,
        }
    }

    /// Only variables up to this count are printed in DIMACS form; later
    /// (auxiliary) variables stay internal.
    pub fn set_last_visible_var(&mut self, bound: usize) {
        self.last_visible_var = bound;
    }

    pub fn set_no_ids(&mut self, value: bool) {
        self.no_ids = value;
    }

    pub fn add_visible(&mut self, literal: Literal, text: String) {
        self.visible.push(VisibleLiteral { literal, text });
    }

    pub fn has_visible(&self) -> bool {
        !self.visible.is_empty()
    }

    pub fn visible_literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.visible.iter().map(|visible| visible.literal)
    }

    pub fn num_models(&self) -> u64 {
        self.model_count
    }

    /// Handle the body of a `v` line: either a template override
    /// (`model start:…`) or a literal followed by its display string. The
    /// literal is returned so the caller can grow the solver.
    pub fn parse_directive(&mut self, line: &str, position: usize) -> Result<Option<i64>, ParseError> {
        let prefixes: [(&str, fn(&mut OutputTemplates) -> &mut String); 15] = [
            ("iterations start:", |t| &mut t.iterations_start),
            ("iterations end:", |t| &mut t.iterations_end),
            ("iteration start:", |t| &mut t.iteration_start),
            ("iteration sep:", |t| &mut t.iteration_sep),
            ("iteration end:", |t| &mut t.iteration_end),
            ("models unknown:", |t| &mut t.models_unknown),
            ("models none:", |t| &mut t.models_none),
            ("models start:", |t| &mut t.models_start),
            ("models end:", |t| &mut t.models_end),
            ("model start:", |t| &mut t.model_start),
            ("model sep:", |t| &mut t.model_sep),
            ("model end:", |t| &mut t.model_end),
            ("lit start:", |t| &mut t.lit_start),
            ("lit sep:", |t| &mut t.lit_sep),
            ("lit end:", |t| &mut t.lit_end),
        ];

        if line.trim_start().starts_with("no ids") {
            self.no_ids = true;
            return Ok(None);
        }
        if let Some(rest) = line.trim_start().strip_prefix("var last:") {
            let bound: usize = rest.trim().parse().map_err(|_| ParseError::Invalid {
                message: format!("invalid visible-variable bound {rest:?}"),
                position,
            })?;
            self.last_visible_var = bound;
            return Ok(None);
        }
        for (prefix, accessor) in prefixes {
            if let Some(rest) = line.strip_prefix(prefix) {
                *accessor(&mut self.templates) = rest.to_owned();
                return Ok(None);
            }
        }

        // Otherwise: "<lit> <display string>".
        let mut parts = line.trim_start().splitn(2, char::is_whitespace);
        let literal_text = parts.next().unwrap_or("");
        let value: i64 = literal_text.parse().map_err(|_| ParseError::Invalid {
            message: format!("invalid visible literal {literal_text:?}"),
            position,
        })?;
        if value == 0 {
            return Err(ParseError::Invalid {
                message: "a visible literal must be nonzero".to_owned(),
                position,
            });
        }
        let text = parts.next().unwrap_or("").to_owned();
        self.visible.push(VisibleLiteral {
            literal: Literal::from_dimacs(value),
            text,
        });
        Ok(Some(value))
    }

    pub fn on_start(&mut self) {
        self.iteration_count = 0;
    }

    pub fn on_start_iteration(&mut self) {
        self.iteration_count += 1;
        if self.iteration_count == 1 {
            self.pretty_print_counted(&self.templates.iterations_start, self.iteration_count);
        } else {
            self.pretty_print_counted(&self.templates.iteration_sep, self.iteration_count);
        }
        self.pretty_print_counted(&self.templates.iteration_start, self.iteration_count);
        self.model_count = 0;
    }

    pub fn on_model(&mut self, model: &[TruthValue]) {
        self.model_count += 1;
        if !self.print_model {
            return;
        }

        if self.model_count == 1 {
            self.pretty_print_counted(&self.templates.models_start, self.model_count);
        } else {
            self.pretty_print_counted(&self.templates.model_sep, self.model_count);
        }
        self.pretty_print_counted(&self.templates.model_start, self.model_count);

        if self.visible.is_empty() {
            if !self.no_ids {
                let bound = self.last_visible_var.min(model.len());
                for index in 0..bound {
                    if index > 0 {
                        self.pretty_print_counted(&self.templates.lit_sep, index as u64 + 1);
                    }
                    self.pretty_print_counted(&self.templates.lit_start, index as u64 + 1);
                    if model[index].is_false() {
                        print!("-");
                    }
                    print!("{}", index + 1);
                    self.pretty_print_counted(&self.templates.lit_end, index as u64 + 1);
                }
            }
        } else {
            let mut printed = 0u64;
            for visible in &self.visible {
                let index = visible.literal.get_propositional_variable().index();
                let value = model.get(index).copied().unwrap_or(TruthValue::Undef);
                let holds = if visible.literal.is_positive() {
                    value.is_true()
                } else {
                    !value.is_true()
                };
                if !holds {
                    continue;
                }
                printed += 1;
                if printed > 1 {
                    self.pretty_print_counted(&self.templates.lit_sep, printed);
                }
                self.pretty_print_counted(&self.templates.lit_start, printed);
                print!("{}", visible.text);
                self.pretty_print_counted(&self.templates.lit_end, printed);
            }
        }
        self.pretty_print_counted(&self.templates.model_end, self.model_count);
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }

    pub fn on_done_iteration(&mut self, interrupted: bool) {
        if self.model_count > 0 {
            self.pretty_print_counted(&self.templates.models_end, self.model_count);
        } else if interrupted {
            self.pretty_print_counted(&self.templates.models_unknown, self.model_count);
        } else {
            self.pretty_print_counted(&self.templates.models_none, self.model_count);
        }
        self.pretty_print_counted(&self.templates.iteration_end, self.iteration_count);
    }

    pub fn on_done(&mut self) {
        self.pretty_print_counted(&self.templates.iterations_end, self.iteration_count);
    }

    /// Render a template: `#` prints the counter, `\n` a newline.
    fn pretty_print_counted(&self, template: &str, count: u64) {
        let mut characters = template.chars().peekable();
        while let Some(character) = characters.next() {
            if character == '#' {
                print!("{count}");
            } else if character == '\\' && characters.peek() == Some(&'n') {
                let _ = characters.next();
                println!();
            } else {
                print!("{character}");
            }
        }
    }
}
