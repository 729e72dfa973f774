//! VDU Session
//!
//! Ties together the decoder, the VDU state and a display backend, and
//! applies decoded commands. This is the main integration point between the
//! byte stream and whatever draws the result.
//!
//! Each complete command produces one `Result<Outcome>`:
//! - `Err` for malformed input (the decoder has already resynchronised)
//! - `Ok(Outcome::Unsupported)` for recognised work the session or backend
//!   cannot carry out; the stream continues
//! - `Ok(Outcome::Handled)` otherwise
//!
//! The backend's `present` runs once after every command that drew
//! something or moved the text cursor.

use std::sync::{Arc, Mutex};

use crate::backend::{Backend, Glyph, Outcome, Paint};
use crate::core::mode;
use crate::core::{
    decode_flags, default_graphics_window, default_text_window, direction, palette, read_slot,
    ColourSnapshot, ColourTarget, GraphicsCursor, MovementVectors, Point, RasterOp, Rect, Rgb,
    ScreenMode, ScreenModeKind, Snapshot, TextCursor, VduVariables, Vector,
};
use crate::error::Result;
use crate::parser::{
    Decoder, ExtendedCommand, PaletteWrite, VduAction, PALETTE_BORDER, PALETTE_RGB,
};
use crate::plot::{self, PlotCode, PlotEffect, Shape};

/// A VDU driver bound to one backend
pub struct Session<B: Backend> {
    decoder: Decoder,
    mode: ScreenMode,
    kind: ScreenModeKind,
    vars: VduVariables,
    graphics: GraphicsCursor,
    text: TextCursor,
    /// The cursor reached the window edge with scroll protection on
    wrap_pending: bool,
    /// Something was sent to the backend since the last present
    dirty: bool,
    backend: B,
}

impl<B: Backend> Session<B> {
    /// Create a session in mode 0
    pub fn new(backend: B) -> Self {
        let mode = mode::all()[0];
        Self::build(backend, mode)
    }

    /// Create a session in the given mode
    pub fn with_mode(backend: B, number: u8) -> Result<Self> {
        let mode = mode::resolve(number)?;
        Ok(Self::build(backend, mode))
    }

    fn build(backend: B, mode: ScreenMode) -> Self {
        let mut session = Self {
            decoder: Decoder::new(),
            mode,
            kind: ScreenModeKind::for_mode(&mode),
            vars: VduVariables::new(&mode),
            graphics: GraphicsCursor::new(),
            text: TextCursor::new(),
            wrap_pending: false,
            dirty: false,
            backend,
        };
        session.announce_mode();
        session.backend.present();
        session.dirty = false;
        session
    }

    pub fn mode(&self) -> &ScreenMode {
        &self.mode
    }

    pub fn kind(&self) -> &ScreenModeKind {
        &self.kind
    }

    pub fn variables(&self) -> &VduVariables {
        &self.vars
    }

    pub fn graphics_cursor(&self) -> &GraphicsCursor {
        &self.graphics
    }

    pub fn text_cursor(&self) -> &TextCursor {
        &self.text
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Physical colour for a logical colour and tint in the current mode
    pub fn resolve_colour(&self, logical: u8, tint: u8) -> Rgb {
        self.kind.resolve(logical, tint)
    }

    /// Read a VDU variable by slot number
    pub fn read_variable(&self, slot: u16) -> Option<i32> {
        read_slot(slot, &self.vars, &self.mode, &self.graphics)
    }

    /// Feed bytes; one result per completed command, in order
    pub fn write(&mut self, bytes: &[u8]) -> Vec<Result<Outcome>> {
        let mut results = Vec::new();
        for byte in bytes {
            if let Some(result) = self.write_byte(*byte) {
                results.push(result);
            }
        }
        results
    }

    /// Feed one byte
    pub fn write_byte(&mut self, byte: u8) -> Option<Result<Outcome>> {
        let decoded = self.decoder.push(byte)?;
        let result = match decoded {
            Ok(action) => self.apply(action),
            Err(err) => {
                tracing::warn!("Dropped VDU command: {}", err);
                Err(err)
            }
        };
        if self.dirty {
            self.backend.present();
            self.dirty = false;
        }
        Some(result)
    }

    /// Discard a partially received command
    pub fn cancel(&mut self) {
        if let Some(opcode) = self.decoder.pending_opcode() {
            tracing::debug!("Cancelled partial VDU {}", opcode);
        }
        self.decoder.reset();
    }

    /// Apply one decoded command
    pub fn apply(&mut self, action: VduAction) -> Result<Outcome> {
        tracing::trace!("Apply {:?}", action);
        let cursor_before = self.text;
        let outcome = self.dispatch(action)?;
        if self.text != cursor_before {
            self.backend
                .set_cursor(self.text.col, self.text.row, self.text.visible);
            self.dirty = true;
        }
        if let Outcome::Unsupported(ref what) = outcome {
            tracing::debug!("{}", what);
        }
        Ok(outcome)
    }

    fn dispatch(&mut self, action: VduAction) -> Result<Outcome> {
        let outcome = match action {
            VduAction::Null | VduAction::Escape => Outcome::Handled,
            VduAction::PrinterByte(_) => Outcome::unsupported("printer output"),
            VduAction::TextAtTextCursor => {
                self.vars.text_at_graphics = false;
                Outcome::Handled
            }
            VduAction::TextAtGraphicsCursor => {
                if self.mode.is_text_only() {
                    return Ok(Outcome::unsupported(
                        "graphics cursor text in a text-only mode",
                    ));
                }
                self.vars.text_at_graphics = true;
                Outcome::Handled
            }
            VduAction::Bell => {
                self.backend.bell();
                Outcome::Handled
            }
            VduAction::Backspace => {
                let g = self.geometry();
                self.move_cursor(g.advance.negated(), g.end_of_line.negated());
                Outcome::Handled
            }
            VduAction::Forward => {
                let g = self.geometry();
                self.move_cursor(g.advance, g.end_of_line);
                Outcome::Handled
            }
            VduAction::LineFeed => {
                let g = self.geometry();
                self.move_line(g.end_of_line);
                Outcome::Handled
            }
            VduAction::LineUp => {
                let g = self.geometry();
                self.move_line(g.end_of_line.negated());
                Outcome::Handled
            }
            VduAction::CarriageReturn => {
                let g = self.geometry();
                self.enter_from(g.advance);
                Outcome::Handled
            }
            VduAction::Home => {
                self.home();
                Outcome::Handled
            }
            VduAction::ClearText => self.clear_text(),
            VduAction::ClearGraphics => self.clear_graphics(),
            VduAction::TextColour(colour) => {
                self.set_text_colour(colour);
                Outcome::Handled
            }
            VduAction::GraphicsColour { action, colour } => {
                self.set_graphics_colour(action, colour);
                Outcome::Handled
            }
            VduAction::Palette(write) => self.write_palette(write),
            VduAction::RestoreColours => {
                self.restore_colours();
                Outcome::Handled
            }
            VduAction::SelectMode(number) => self.select_mode(number)?,
            VduAction::Extended(cmd) => self.extended(cmd),
            VduAction::GraphicsWindow(rect) => {
                self.set_graphics_window(rect);
                Outcome::Handled
            }
            VduAction::Plot { code, x, y } => self.plot(code, x, y),
            VduAction::RestoreWindows => {
                self.vars.reset_windows(&self.mode);
                self.vars.origin = Point::default();
                self.graphics.set_current(Point::default());
                self.wrap_pending = false;
                self.home();
                Outcome::Handled
            }
            VduAction::TextWindow(rect) => {
                self.set_text_window(rect);
                Outcome::Handled
            }
            VduAction::Origin { x, y } => {
                self.vars.origin = Point::new(i32::from(x), i32::from(y));
                Outcome::Handled
            }
            VduAction::TabTo { col, row } => {
                self.tab_to(col, row);
                Outcome::Handled
            }
            VduAction::Print(code) | VduAction::UserGlyph(code) => self.print(code),
            VduAction::Delete => self.delete(),
        };
        Ok(outcome)
    }

    // ---- modes and colours ----

    /// Switch screen mode. An unknown mode leaves the current one active.
    pub fn select_mode(&mut self, number: u8) -> Result<Outcome> {
        let mode = mode::resolve(number).map_err(|err| {
            tracing::warn!("{}", err);
            err
        })?;
        tracing::debug!("Mode {} ({}x{})", mode.id, mode.text_width, mode.text_height);
        self.mode = mode;
        self.kind = ScreenModeKind::for_mode(&mode);
        self.vars.reset_for_mode(&mode);
        self.graphics.reset();
        self.wrap_pending = false;
        self.announce_mode();
        Ok(Outcome::Handled)
    }

    fn announce_mode(&mut self) {
        self.backend.mode_changed(&self.mode, self.kind.palette());
        self.text.move_to(0, 0);
        self.home();
        self.notify_text_colours();
        let window = self.vars.text_window;
        let bg = self.colour_of(ColourTarget::TextBackground);
        self.backend.clear_text(window, bg);
        self.backend
            .set_cursor(self.text.col, self.text.row, self.text.visible);
        self.dirty = true;
    }

    fn colour_of(&self, target: ColourTarget) -> Rgb {
        let (colour, tint) = self.vars.colour(target);
        self.kind.resolve(colour, tint)
    }

    fn notify_text_colours(&mut self) {
        let fg = self.colour_of(ColourTarget::TextForeground);
        let bg = self.colour_of(ColourTarget::TextBackground);
        self.backend.set_text_colours(fg, bg);
    }

    fn set_text_colour(&mut self, colour: u8) {
        let logical = colour & self.mode.colour_mask();
        if colour & 0x80 != 0 {
            self.vars.text_bg = logical;
        } else {
            self.vars.text_fg = logical;
        }
        self.notify_text_colours();
    }

    fn set_graphics_colour(&mut self, action: u8, colour: u8) {
        let logical = colour & self.mode.colour_mask();
        let op = RasterOp::from_action(action);
        if colour & 0x80 != 0 {
            self.vars.gfx_bg = logical;
            self.vars.gfx_bg_action = op;
        } else {
            self.vars.gfx_fg = logical;
            self.vars.gfx_fg_action = op;
        }
    }

    fn write_palette(&mut self, write: PaletteWrite) -> Outcome {
        if write.physical == PALETTE_BORDER {
            self.vars.border = write.rgb.unwrap_or(Rgb::BLACK);
            return Outcome::Handled;
        }
        let colour = match (write.physical, write.rgb) {
            (PALETTE_RGB, Some(rgb)) => rgb,
            (p, _) if p < 16 => palette::physical_colour(p),
            (p, _) => return Outcome::unsupported("palette operation").with_code(p),
        };
        let Some(current) = self.kind.palette() else {
            return Outcome::unsupported("palette in a mode without one").with_code(self.mode.id);
        };
        let updated = current.with_entry(write.logical, colour);
        self.kind.replace_palette(updated);
        if let Some(active) = self.kind.palette() {
            self.backend.palette_changed(active);
        }
        self.notify_text_colours();
        self.dirty = true;
        Outcome::Handled
    }

    fn restore_colours(&mut self) {
        self.vars.reset_colours(&self.mode);
        self.kind = ScreenModeKind::for_mode(&self.mode);
        if let Some(active) = self.kind.palette() {
            self.backend.palette_changed(active);
            self.dirty = true;
        }
        self.notify_text_colours();
    }

    // ---- VDU 23 ----

    fn extended(&mut self, cmd: ExtendedCommand) -> Outcome {
        match cmd {
            ExtendedCommand::Crtc { register, .. } => {
                Outcome::unsupported("video controller register").with_code(register)
            }
            ExtendedCommand::CursorAppearance(value) => {
                self.text.visible = value != 0;
                Outcome::Handled
            }
            ExtendedCommand::ScrollBlock {
                extent,
                direction,
                movement,
            } => {
                let g = self.geometry();
                let step = match direction {
                    0 => Vector::new(1, 0),
                    1 => Vector::new(-1, 0),
                    2 => Vector::new(0, 1),
                    3 => Vector::new(0, -1),
                    4 => g.advance,
                    5 => g.advance.negated(),
                    6 => g.end_of_line,
                    7 => g.end_of_line.negated(),
                    other => return Outcome::unsupported("scroll direction").with_code(other),
                };
                let window = if extent == 0 {
                    self.vars.text_window
                } else {
                    default_text_window(&self.mode)
                };
                self.backend.scroll(window, step, movement != 0);
                self.dirty = true;
                Outcome::Handled
            }
            ExtendedCommand::PrintDirection { value, mask } => {
                self.vars.text_direction = (self.vars.text_direction & mask) ^ value;
                self.wrap_pending = false;
                Outcome::Handled
            }
            ExtendedCommand::Tint { which, tint } => {
                let target = match which {
                    0 => ColourTarget::TextForeground,
                    1 => ColourTarget::TextBackground,
                    2 => ColourTarget::GraphicsForeground,
                    _ => ColourTarget::GraphicsBackground,
                };
                self.vars.set_tint(target, tint);
                if which < 2 {
                    self.notify_text_colours();
                }
                Outcome::Handled
            }
            ExtendedCommand::DefineGlyph { code, rows } => {
                self.backend.define_glyph(code, Glyph(rows)).with_code(code)
            }
        }
    }

    // ---- windows ----

    fn set_graphics_window(&mut self, rect: Rect) {
        let origin = self.vars.origin;
        let window = Rect::new(
            rect.left.min(rect.right) + origin.x,
            rect.bottom.min(rect.top) + origin.y,
            rect.left.max(rect.right) + origin.x,
            rect.bottom.max(rect.top) + origin.y,
        );
        let screen = default_graphics_window(&self.mode);
        if window.left < screen.left
            || window.bottom < screen.bottom
            || window.right > screen.right
            || window.top > screen.top
        {
            tracing::debug!("Ignored off-screen graphics window {:?}", window);
            return;
        }
        self.vars.graphics_window = window;
    }

    fn set_text_window(&mut self, rect: Rect) {
        let screen = default_text_window(&self.mode);
        let valid = rect.left <= rect.right
            && rect.top <= rect.bottom
            && rect.left >= screen.left
            && rect.right <= screen.right
            && rect.top >= screen.top
            && rect.bottom <= screen.bottom;
        if !valid {
            tracing::debug!("Ignored invalid text window {:?}", rect);
            return;
        }
        self.vars.text_window = rect;
        self.wrap_pending = false;
        if !rect.contains_cell(self.text.col, self.text.row) {
            self.home_text();
        }
    }

    // ---- text cursor ----

    /// Movement axes for cursor control; the no-move bit only affects printing
    fn geometry(&self) -> MovementVectors {
        decode_flags(self.vars.text_direction & !direction::NO_MOVE)
    }

    /// Place the cursor on the edge a step of `v` enters the window from
    fn enter_from(&mut self, v: Vector) {
        if self.vars.text_at_graphics {
            self.graphics_enter_from(v);
            return;
        }
        let w = self.vars.text_window;
        if v.dx > 0 {
            self.text.col = w.left;
        } else if v.dx < 0 {
            self.text.col = w.right;
        }
        if v.dy > 0 {
            self.text.row = w.top;
        } else if v.dy < 0 {
            self.text.row = w.bottom;
        }
    }

    fn home(&mut self) {
        let g = self.geometry();
        self.enter_from(g.advance);
        self.enter_from(g.end_of_line);
    }

    fn home_text(&mut self) {
        let g = self.geometry();
        let w = self.vars.text_window;
        self.text.move_to(w.left, w.top);
        let at_graphics = std::mem::replace(&mut self.vars.text_at_graphics, false);
        self.enter_from(g.advance);
        self.enter_from(g.end_of_line);
        self.vars.text_at_graphics = at_graphics;
    }

    /// Step along a line, wrapping onto the next line at the window edge
    fn move_cursor(&mut self, step: Vector, line: Vector) {
        self.wrap_pending = false;
        if self.vars.text_at_graphics {
            let next = self.graphics_step(self.graphics.current(), step);
            if self.graphics_window_user().contains_point(next) {
                self.graphics.set_current(next);
            } else {
                self.graphics_enter_from(step);
                self.move_line(line);
            }
            return;
        }
        self.text.step(step);
        if !self.vars.text_window.contains_cell(self.text.col, self.text.row) {
            self.enter_from(step);
            self.move_line(line);
        }
    }

    /// Step to the next or previous line, scrolling at the window edge
    fn move_line(&mut self, line: Vector) {
        self.wrap_pending = false;
        let no_scroll = self.vars.text_direction & direction::NO_SCROLL != 0;
        if self.vars.text_at_graphics {
            let next = self.graphics_step(self.graphics.current(), line);
            if self.graphics_window_user().contains_point(next) {
                self.graphics.set_current(next);
            } else {
                self.graphics_enter_from(line);
            }
            return;
        }
        self.text.step(line);
        let window = self.vars.text_window;
        if window.contains_cell(self.text.col, self.text.row) {
            return;
        }
        if no_scroll {
            self.enter_from(line);
        } else {
            self.text.step(line.negated());
            self.backend.scroll(window, line.negated(), false);
            self.dirty = true;
        }
    }

    fn tab_to(&mut self, col: u8, row: u8) {
        let w = self.vars.text_window;
        let col = w.left + i32::from(col);
        let row = w.top + i32::from(row);
        if w.contains_cell(col, row) {
            self.text.move_to(col, row);
            self.wrap_pending = false;
        } else {
            tracing::debug!("Ignored tab outside the text window ({}, {})", col, row);
        }
    }

    // ---- character output ----

    fn print(&mut self, code: u8) -> Outcome {
        if self.vars.text_at_graphics {
            return self.print_at_graphics(code);
        }
        let flags = self.vars.text_direction;
        let g = self.geometry();
        if self.wrap_pending {
            self.wrap_pending = false;
            self.enter_from(g.advance);
            self.move_line(g.end_of_line);
        }
        self.backend.put_char(code, self.text.col, self.text.row);
        self.dirty = true;
        if flags & direction::NO_MOVE != 0 {
            return Outcome::Handled;
        }
        self.text.step(g.advance);
        if !self.vars.text_window.contains_cell(self.text.col, self.text.row) {
            if flags & direction::PENDING_WRAP != 0 {
                self.text.step(g.advance.negated());
                self.wrap_pending = true;
            } else {
                self.enter_from(g.advance);
                self.move_line(g.end_of_line);
            }
        }
        Outcome::Handled
    }

    fn delete(&mut self) -> Outcome {
        let g = self.geometry();
        self.move_cursor(g.advance.negated(), g.end_of_line.negated());
        if self.vars.text_at_graphics {
            let (w, h) = self.char_step();
            let at = self.absolute(self.graphics.current());
            let cell = Rect::new(
                at.x,
                at.y.saturating_sub(h - 1),
                at.x.saturating_add(w - 1),
                at.y,
            );
            let paint = self.paint(PlotEffect::Background);
            self.dirty = true;
            return self.backend.fill_rectangle(cell, &paint);
        }
        self.backend.put_char(b' ', self.text.col, self.text.row);
        self.dirty = true;
        Outcome::Handled
    }

    fn print_at_graphics(&mut self, code: u8) -> Outcome {
        let glyph = self.backend.glyph_bitmap(code);
        let at = self.absolute(self.graphics.current());
        let paint = self.paint(PlotEffect::Foreground);
        let outcome = self.backend.blit_glyph(at, &glyph, &paint).with_code(code);
        self.dirty = true;

        let mv = decode_flags(self.vars.text_direction);
        if mv.suppress_movement {
            return outcome;
        }
        let next = self.graphics_step(self.graphics.current(), mv.advance);
        if mv.suppress_graphics_wrap || self.graphics_window_user().contains_point(next) {
            self.graphics.set_current(next);
        } else {
            self.graphics_enter_from(mv.advance);
            self.move_line(mv.end_of_line);
        }
        outcome
    }

    /// Character cell size in graphics units, including spacing
    fn char_step(&self) -> (i32, i32) {
        let (w, h) = self.mode.char_size_units();
        (w + self.vars.char_spacing.0, h + self.vars.char_spacing.1)
    }

    /// One character step in graphics units. Text rows grow downwards.
    fn graphics_step(&self, from: Point, v: Vector) -> Point {
        let (w, h) = self.char_step();
        from.offset(v.dx * w, -v.dy * h)
    }

    /// Graphics window relative to the current origin
    fn graphics_window_user(&self) -> Rect {
        let w = self.vars.graphics_window;
        let o = self.vars.origin;
        Rect::new(w.left - o.x, w.bottom - o.y, w.right - o.x, w.top - o.y)
    }

    fn graphics_enter_from(&mut self, v: Vector) {
        let w = self.graphics_window_user();
        let (cw, ch) = self.char_step();
        let mut p = self.graphics.current();
        if v.dx > 0 {
            p.x = w.left;
        } else if v.dx < 0 {
            p.x = w.right - cw + 1;
        }
        if v.dy > 0 {
            p.y = w.top;
        } else if v.dy < 0 {
            p.y = w.bottom + ch - 1;
        }
        self.graphics.set_current(p);
    }

    // ---- clearing ----

    fn clear_text(&mut self) -> Outcome {
        if self.vars.text_at_graphics {
            let outcome = self.clear_graphics();
            self.home();
            return outcome;
        }
        let window = self.vars.text_window;
        let bg = self.colour_of(ColourTarget::TextBackground);
        self.backend.clear_text(window, bg);
        self.dirty = true;
        self.wrap_pending = false;
        self.home();
        Outcome::Handled
    }

    fn clear_graphics(&mut self) -> Outcome {
        if self.mode.is_text_only() {
            return Outcome::unsupported("graphics in a text-only mode");
        }
        let paint = self.paint(PlotEffect::Background);
        self.dirty = true;
        self.backend.clear_graphics(&paint)
    }

    // ---- PLOT ----

    fn absolute(&self, p: Point) -> Point {
        p.offset(self.vars.origin.x, self.vars.origin.y)
    }

    fn paint(&self, effect: PlotEffect) -> Paint {
        let (colour, op) = match effect {
            PlotEffect::Background => (
                self.colour_of(ColourTarget::GraphicsBackground),
                self.vars.gfx_bg_action,
            ),
            PlotEffect::Inverse => (
                self.colour_of(ColourTarget::GraphicsForeground),
                RasterOp::Invert,
            ),
            PlotEffect::Move | PlotEffect::Foreground => (
                self.colour_of(ColourTarget::GraphicsForeground),
                self.vars.gfx_fg_action,
            ),
        };
        Paint {
            colour,
            op,
            clip: self.vars.graphics_window,
        }
    }

    fn plot(&mut self, code: u8, x: i16, y: i16) -> Outcome {
        let plot = PlotCode::decode(code);
        let point = plot.resolve_point(self.graphics.current(), x, y);
        self.graphics.record_plot(point.x, point.y);

        if plot.effect == PlotEffect::Move {
            return Outcome::Handled;
        }
        if self.mode.is_text_only() {
            return Outcome::unsupported("graphics in a text-only mode").with_code(code);
        }

        let (oldest, old, current) = self.graphics.history();
        let history = (
            self.absolute(oldest),
            self.absolute(old),
            self.absolute(current),
        );
        let Some(shapes) = plot::shapes(&plot, history) else {
            return Outcome::unsupported(plot.primitive.name()).with_code(code);
        };

        let paint = self.paint(plot.effect);
        let mut outcome = Outcome::Handled;
        for shape in shapes {
            outcome = outcome.and(self.draw(shape, &paint));
        }
        self.dirty = true;
        outcome.with_code(code)
    }

    fn draw(&mut self, shape: Shape, paint: &Paint) -> Outcome {
        match shape {
            Shape::Line { from, to, style } => self.backend.draw_line(from, to, style, paint),
            Shape::Point(at) => self.backend.draw_point(at, paint),
            Shape::Triangle(a, b, c) => self.backend.fill_triangle(a, b, c, paint),
            Shape::Rectangle(rect) => self.backend.fill_rectangle(rect, paint),
            Shape::Circle {
                centre,
                radius,
                filled,
            } => {
                if filled {
                    self.backend.fill_circle(centre, radius, paint)
                } else {
                    self.backend.draw_circle(centre, radius, paint)
                }
            }
            Shape::Ellipse {
                centre,
                radius_x,
                radius_y,
                filled,
            } => {
                if filled {
                    self.backend.fill_ellipse(centre, radius_x, radius_y, paint)
                } else {
                    self.backend.draw_ellipse(centre, radius_x, radius_y, paint)
                }
            }
            Shape::BlockTransfer {
                source,
                dest,
                clear_source,
            } => {
                let background = self.paint(PlotEffect::Background);
                self.backend
                    .transfer_block(source, dest, clear_source, &background)
            }
        }
    }

    // ---- snapshot ----

    pub fn snapshot(&self) -> Snapshot {
        let (oldest, old, current) = self.graphics.history();
        let v = &self.vars;
        Snapshot {
            mode: self.mode,
            text_window: v.text_window,
            graphics_window: v.graphics_window,
            origin: v.origin,
            graphics_cursor: [oldest, old, current],
            text_cursor: self.text,
            text_at_graphics: v.text_at_graphics,
            text_direction: v.text_direction,
            colours: ColourSnapshot {
                text_fg: v.text_fg,
                text_bg: v.text_bg,
                gfx_fg: v.gfx_fg,
                gfx_bg: v.gfx_bg,
                text_fg_tint: v.text_fg_tint,
                text_bg_tint: v.text_bg_tint,
                gfx_fg_tint: v.gfx_fg_tint,
                gfx_bg_tint: v.gfx_bg_tint,
                gfx_fg_action: v.gfx_fg_action,
                gfx_bg_action: v.gfx_bg_action,
            },
            palette: self.kind.palette().map(|p| p.entries().to_vec()),
            border: v.border,
        }
    }
}

/// A session shared between threads.
///
/// Each `write` holds the lock for the whole byte slice, so commands from
/// different writers never interleave mid-command as long as every writer
/// sends whole commands.
pub struct SharedSession<B: Backend> {
    inner: Arc<Mutex<Session<B>>>,
}

impl<B: Backend> Clone for SharedSession<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> SharedSession<B> {
    pub fn new(session: Session<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn write(&self, bytes: &[u8]) -> Vec<Result<Outcome>> {
        self.with(|session| session.write(bytes))
    }

    /// Run a closure with exclusive access to the session
    pub fn with<R>(&self, f: impl FnOnce(&mut Session<B>) -> R) -> R {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.with(|session| session.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, NullBackend, Recorder};
    use crate::error::VduError;
    use crate::plot::LineStyle;

    fn session(mode: u8) -> Session<Recorder> {
        let mut session = Session::with_mode(Recorder::new(), mode).unwrap();
        session.backend_mut().clear();
        session
    }

    #[test]
    fn test_session_print() {
        let mut s = session(0);
        let results = s.write(b"Hi");
        assert_eq!(results.len(), 2);
        assert_eq!(s.backend().chars(), vec![(b'H', 0, 0), (b'i', 1, 0)]);
        assert_eq!((s.text_cursor().col, s.text_cursor().row), (2, 0));
        assert_eq!(s.backend().presents, 2);
    }

    #[test]
    fn test_session_cursor_move_presents() {
        let mut s = session(0);
        s.write(&[10, 31, 5, 5, 30]);
        assert_eq!(s.backend().presents, 3);

        // Already home
        s.write(&[30]);
        assert_eq!(s.backend().presents, 3);
    }

    #[test]
    fn test_session_wraps_at_window_edge() {
        let mut s = session(0);
        s.write(&[31, 79, 0]);
        s.write(b"AB");
        assert_eq!(s.backend().chars(), vec![(b'A', 79, 0), (b'B', 0, 1)]);
    }

    #[test]
    fn test_session_scrolls_at_bottom() {
        let mut s = session(0);
        s.write(&[31, 0, 31, 10]);
        let scrolls = s
            .backend()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Scroll { .. }))
            .count();
        assert_eq!(scrolls, 1);
        assert_eq!(s.text_cursor().row, 31);
    }

    #[test]
    fn test_session_no_scroll_wraps_to_top() {
        let mut s = session(0);
        // VDU 23,16,16,0 sets the no-scroll bit
        s.write(&[23, 16, 16, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(s.variables().text_direction, 16);
        s.write(&[31, 0, 31, 10]);
        assert_eq!(s.text_cursor().row, 0);
        assert!(!s
            .backend()
            .calls
            .iter()
            .any(|c| matches!(c, Call::Scroll { .. })));
    }

    #[test]
    fn test_session_reversed_direction() {
        let mut s = session(0);
        s.write(&[23, 16, direction::REVERSE_X, 0, 0, 0, 0, 0, 0, 0]);
        s.write(&[30]);
        assert_eq!(s.text_cursor().col, 79);
        s.write(b"X");
        assert_eq!(s.text_cursor().col, 78);
    }

    #[test]
    fn test_session_pending_wrap() {
        let mut s = session(0);
        s.write(&[23, 16, direction::PENDING_WRAP, 0, 0, 0, 0, 0, 0, 0]);
        s.write(&[31, 79, 0]);
        s.write(b"A");
        assert_eq!((s.text_cursor().col, s.text_cursor().row), (79, 0));
        s.write(b"B");
        assert_eq!(s.backend().chars(), vec![(b'A', 79, 0), (b'B', 0, 1)]);
    }

    #[test]
    fn test_session_backspace_wraps_to_previous_line() {
        let mut s = session(0);
        s.write(&[31, 0, 5, 8]);
        assert_eq!((s.text_cursor().col, s.text_cursor().row), (79, 4));
    }

    #[test]
    fn test_session_delete_blanks_previous_cell() {
        let mut s = session(0);
        s.write(b"AB");
        s.write(&[127]);
        assert_eq!(s.backend().chars().last(), Some(&(b' ', 1, 0)));
        assert_eq!(s.text_cursor().col, 1);
    }

    #[test]
    fn test_session_text_window_and_tab() {
        let mut s = session(0);
        s.write(&[28, 10, 0, 20, 0, 30, 0, 5, 0]);
        assert_eq!(s.variables().text_window, Rect::new(10, 20, 30, 5));
        assert_eq!((s.text_cursor().col, s.text_cursor().row), (10, 5));
        s.write(&[31, 2, 3]);
        assert_eq!((s.text_cursor().col, s.text_cursor().row), (12, 8));
        // Outside the window: ignored
        s.write(&[31, 50, 0]);
        assert_eq!((s.text_cursor().col, s.text_cursor().row), (12, 8));
        s.write(&[26]);
        assert_eq!(s.variables().text_window, Rect::new(0, 31, 79, 0));
    }

    #[test]
    fn test_session_invalid_text_window_ignored() {
        let mut s = session(0);
        s.write(&[28, 30, 0, 20, 0, 10, 0, 5, 0]);
        assert_eq!(s.variables().text_window, Rect::new(0, 31, 79, 0));
    }

    #[test]
    fn test_session_plot_line() {
        let mut s = session(28);
        let results = s.write(&[25, 4, 0x40, 0x01, 0xF0, 0x00, 25, 5, 0x80, 0x02, 0xE0, 0x01]);
        assert_eq!(results, vec![Ok(Outcome::Handled), Ok(Outcome::Handled)]);
        let (_, old, current) = s.graphics_cursor().history();
        assert_eq!(old, Point::new(320, 240));
        assert_eq!(current, Point::new(640, 480));
        let draws: Vec<_> = s.backend().draw_calls().cloned().collect();
        assert_eq!(
            draws,
            vec![Call::Line {
                from: Point::new(320, 240),
                to: Point::new(640, 480),
                style: LineStyle::default(),
                paint: Paint {
                    colour: Rgb::WHITE,
                    op: RasterOp::Set,
                    clip: Rect::new(0, 0, 1279, 959),
                },
            }]
        );
        assert_eq!(s.backend().presents, 1);
    }

    #[test]
    fn test_session_origin_offsets_renderer_coordinates() {
        let mut s = session(28);
        s.write(&[29, 100, 0, 50, 0]);
        s.write(&[25, 69, 10, 0, 10, 0]);
        assert_eq!(s.graphics_cursor().current(), Point::new(10, 10));
        let draws: Vec<_> = s.backend().draw_calls().cloned().collect();
        assert!(matches!(draws[0], Call::Point { at, .. } if at == Point::new(110, 60)));
    }

    #[test]
    fn test_session_relative_plot() {
        let mut s = session(28);
        s.write(&[25, 4, 100, 0, 100, 0]);
        // PLOT 1, -10, 20 (relative draw)
        s.write(&[25, 1, 0xF6, 0xFF, 20, 0]);
        assert_eq!(s.graphics_cursor().current(), Point::new(90, 120));
    }

    #[test]
    fn test_session_unsupported_primitive() {
        let mut s = Session::with_mode(NullBackend, 28).unwrap();
        let results = s.write(&[25, 5, 0, 1, 0, 1]);
        match &results[0] {
            Ok(Outcome::Unsupported(u)) => assert_eq!(u.code, Some(5)),
            other => panic!("unexpected {:?}", other),
        }
        let results = s.write(&[25, 0x85, 0, 0, 0, 0]);
        match &results[0] {
            Ok(Outcome::Unsupported(u)) => {
                assert_eq!(u.what, "flood fill");
                assert_eq!(u.code, Some(0x85));
            }
            other => panic!("unexpected {:?}", other),
        }
        // The point is still recorded
        assert_eq!(s.graphics_cursor().current(), Point::new(0, 0));
        assert_eq!(s.graphics_cursor().previous(), Point::new(256, 256));
    }

    #[test]
    fn test_session_bad_mode_keeps_current() {
        let mut s = session(12);
        let results = s.write(&[22, 99, b'A']);
        assert_eq!(results[0], Err(VduError::NoSuchScreenMode(99)));
        assert_eq!(results[1], Ok(Outcome::Handled));
        assert_eq!(s.mode().id, 12);
    }

    #[test]
    fn test_session_mode_change_resets_state() {
        let mut s = session(28);
        s.write(&[29, 10, 0, 10, 0, 17, 1, 23, 16, 2, 0, 0, 0, 0, 0, 0, 0]);
        s.write(&[22, 1]);
        let vars = s.variables();
        assert_eq!(vars.origin, Point::default());
        assert_eq!(vars.text_fg, 3);
        assert_eq!(vars.text_direction, 2);
        assert!(s
            .backend()
            .calls
            .contains(&Call::ModeChanged { mode: 1 }));
    }

    #[test]
    fn test_session_protocol_error_resyncs() {
        let mut s = session(0);
        let results = s.write(&[2, b'A']);
        assert_eq!(results[0], Err(VduError::Protocol { opcode: 2 }));
        assert_eq!(results[1], Ok(Outcome::Handled));
        assert_eq!(s.backend().chars(), vec![(b'A', 0, 0)]);
    }

    #[test]
    fn test_session_palette_write() {
        let mut s = session(12);
        s.write(&[19, 1, 16, 10, 20, 30]);
        assert_eq!(s.resolve_colour(1, 0), Rgb::new(10, 20, 30));
        s.write(&[19, 2, 4]);
        assert_eq!(s.resolve_colour(2, 0), Rgb::BLUE);
        s.write(&[20]);
        assert_eq!(s.resolve_colour(1, 0), Rgb::RED);
    }

    #[test]
    fn test_session_border_colour() {
        let mut s = session(12);
        s.write(&[19, 0, 24, 1, 2, 3]);
        assert_eq!(s.variables().border, Rgb::new(1, 2, 3));
    }

    #[test]
    fn test_session_colour_masking() {
        let mut s = session(1);
        s.write(&[17, 0x85, 18, 3, 6]);
        assert_eq!(s.variables().text_bg, 1);
        assert_eq!(s.variables().gfx_fg, 2);
        assert_eq!(s.variables().gfx_fg_action, RasterOp::Eor);
    }

    #[test]
    fn test_session_colour_masking_full_colour() {
        let mut s = session(28);
        s.write(&[17, 0x85, 18, 0, 0x85, 17, 0xFF]);
        assert_eq!(s.variables().text_bg, 5);
        assert_eq!(s.variables().gfx_bg, 5);
        assert_eq!(s.variables().text_fg, 63);
        assert_eq!(s.read_variable(156), Some(5));
        assert_eq!(s.snapshot().colours.text_bg, 5);
    }

    #[test]
    fn test_session_relative_plots_far_from_origin() {
        let mut s = Session::with_mode(NullBackend, 28).unwrap();
        s.write(&[25, 4, 0xFF, 0x7F, 0, 0]);
        let step = [25, 0, 0xFF, 0x7F, 0, 0];
        for _ in 0..65_537 {
            s.write(&step);
        }
        assert_eq!(s.graphics_cursor().current().x, 2_147_483_646);

        let results = s.write(&[25, 0x91, 0xFF, 0x7F, 0, 0, 25, 0x71, 0xFF, 0x7F, 0, 0]);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));

        s.write(&[5, 127]);
        assert!(s.variables().text_at_graphics);
    }

    #[test]
    fn test_session_graphics_window_relative_to_origin() {
        let mut s = session(28);
        s.write(&[29, 100, 0, 100, 0]);
        s.write(&[24, 0, 0, 0, 0, 200, 0, 100, 0]);
        assert_eq!(s.variables().graphics_window, Rect::new(100, 100, 300, 200));
    }

    #[test]
    fn test_session_vdu5_text() {
        let mut s = session(28);
        s.write(&[23, 65, 0xFF, 0, 0, 0, 0, 0, 0, 0]);
        s.write(&[5, 25, 4, 0, 0, 0xBF, 3, b'A']);
        let draws: Vec<_> = s.backend().draw_calls().cloned().collect();
        assert!(matches!(
            draws[0],
            Call::Glyph { at, glyph, .. } if at == Point::new(0, 959) && glyph.0[0] == 0xFF
        ));
        assert_eq!(s.graphics_cursor().current(), Point::new(16, 959));
        assert!(s.backend().chars().is_empty());
    }

    #[test]
    fn test_session_cancel_discards_partial_command() {
        let mut s = session(28);
        s.write(&[25, 5, 0x80]);
        s.cancel();
        let results = s.write(b"A");
        assert_eq!(results, vec![Ok(Outcome::Handled)]);
        assert_eq!(s.backend().chars(), vec![(b'A', 0, 0)]);
    }

    #[test]
    fn test_session_read_variable() {
        let mut s = session(28);
        s.write(&[25, 4, 10, 0, 20, 0]);
        assert_eq!(s.read_variable(138), Some(10));
        assert_eq!(s.read_variable(139), Some(20));
        assert_eq!(s.read_variable(1), Some(79));
    }

    #[test]
    fn test_session_cursor_visibility() {
        let mut s = session(0);
        s.write(&[23, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(!s.text_cursor().visible);
        assert_eq!(s.backend().cursor, (0, 0, false));
    }

    #[test]
    fn test_session_snapshot_deterministic() {
        let input = [22u8, 28, 25, 4, 10, 0, 10, 0, b'h', b'i', 17, 3];
        let mut a = session(0);
        let mut b = session(0);
        a.write(&input);
        for byte in input {
            b.write_byte(byte);
        }
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.snapshot().mode.id, 28);
    }

    #[test]
    fn test_shared_session() {
        let shared = SharedSession::new(session(0));
        let other = shared.clone();
        let handle = std::thread::spawn(move || other.write(b"abc"));
        let results = handle.join().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(shared.snapshot().text_cursor.col, 3);
    }
}
