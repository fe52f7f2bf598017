use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::display::Renderer;
use crate::error::{Error, Result};
use crate::keypad::{KeySource, Keypad};
use crate::screen::Screen;
use crate::state::State;
use crate::timer::Timers;
use crate::{font, Config, Instruction, Op, ADDRESS_MASK, FLAG};

/// What the next cycle does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fetch, decode and execute the instruction at PC.
    Running,
    /// `FX0A` is waiting for a key press to store into the given register.
    /// PC already points past the `FX0A`.
    AwaitingKey(usize),
}

/// The fetch/decode/execute engine and everything it mutates.
pub struct Interpreter {
    state: State,
    screen: Screen,
    keypad: Keypad,
    timers: Arc<Timers>,
    renderer: Box<dyn Renderer>,
    rng: StdRng,
    mode: Mode,
    cycles: u64,
    font_offset: u16,
    refresh_interval: u64,
    lazy_render: bool,
    new_shift: bool,
}

impl Interpreter {
    pub fn new(
        config: &Config,
        rom: &[u8],
        keys: Box<dyn KeySource>,
        renderer: Box<dyn Renderer>,
        timers: Arc<Timers>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: State::load(rom, config.rom_offset, config.font_offset)?,
            screen: Screen::new(),
            keypad: Keypad::new(keys),
            timers,
            renderer,
            rng: StdRng::from_entropy(),
            mode: Mode::Running,
            cycles: 0,
            font_offset: config.font_offset,
            refresh_interval: config.refresh_interval as u64,
            lazy_render: config.lazy_render,
            new_shift: config.new_shift,
        })
    }

    /// Replaces the random source used by `CXKK`.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn timers(&self) -> &Arc<Timers> {
        &self.timers
    }

    /// Runs one cycle: either one instruction or one key poll while
    /// waiting in `FX0A`.
    ///
    /// On error the rest of the cycle is skipped; PC has already moved past
    /// the offending word and any register writes made so far stand.
    pub fn step(&mut self) -> Result<()> {
        match self.mode {
            Mode::AwaitingKey(x) => self.await_key(x)?,
            Mode::Running => {
                let addr = self.state.pc;
                let inst = Instruction::from(self.state.fetch());
                let op = inst.decode().ok_or(Error::UnknownInstruction {
                    word: inst.word(),
                    addr,
                })?;
                debug!("Processing instruction [{addr:#05X}: {inst:?}] {op}");
                self.execute(op)?;
            }
        }
        self.periodic_refresh()
    }

    fn periodic_refresh(&mut self) -> Result<()> {
        let cycle = self.cycles;
        self.cycles += 1;
        if !self.lazy_render && cycle % self.refresh_interval == 0 {
            self.renderer.present(self.screen.frame())?;
        }
        Ok(())
    }

    /// Applies the effects of one decoded operation.
    pub fn execute(&mut self, op: Op) -> Result<()> {
        let v = &mut self.state.registers;
        let mut skip = false;
        match op {
            Op::Clear => return self.clear_screen(),
            Op::Return => self.state.pc = self.state.pop()?,
            Op::Jump(addr) => self.state.pc = addr,
            Op::Call(addr) => {
                self.state.push(self.state.pc)?;
                self.state.pc = addr;
            }
            Op::SkipEqImm(x, kk) => skip = v[x] == kk,
            Op::SkipNeImm(x, kk) => skip = v[x] != kk,
            Op::SkipEqReg(x, y) => skip = v[x] == v[y],
            Op::SkipNeReg(x, y) => skip = v[x] != v[y],
            Op::LoadImm(x, kk) => v[x] = kk,
            Op::AddImm(x, kk) => v[x] = v[x].wrapping_add(kk),
            Op::Load(x, y) => v[x] = v[y],
            Op::Or(x, y) => self.logic(x, y, |a, b| a | b),
            Op::And(x, y) => self.logic(x, y, |a, b| a & b),
            Op::Xor(x, y) => self.logic(x, y, |a, b| a ^ b),
            Op::Add(x, y) => {
                let (sum, carry) = v[x].overflowing_add(v[y]);
                v[FLAG] = carry as u8;
                v[x] = sum;
            }
            Op::Sub(x, y) => self.subtract(x, x, y),
            Op::SubN(x, y) => self.subtract(x, y, x),
            Op::ShiftRight(x, y) => {
                let src = if self.new_shift { v[x] } else { v[y] };
                v[x] = src >> 1;
                v[FLAG] = src & 0x01;
            }
            Op::ShiftLeft(x, y) => {
                let src = if self.new_shift { v[x] } else { v[y] };
                v[x] = src << 1;
                v[FLAG] = (src & 0x80) >> 7;
            }
            Op::LoadIndex(addr) => self.state.i = addr,
            Op::JumpOffset(addr) => self.state.pc = (addr + v[0] as u16) & ADDRESS_MASK,
            Op::Random(x, kk) => v[x] = self.rng.gen::<u8>() & kk,
            Op::Draw(x, y, n) => return self.draw_sprite(x, y, n),
            Op::SkipKey(x) => {
                self.keypad.refresh();
                skip = self.keypad.is_pressed(v[x]);
            }
            Op::SkipNotKey(x) => {
                self.keypad.refresh();
                skip = !self.keypad.is_pressed(v[x]);
            }
            Op::ReadDelay(x) => v[x] = self.timers.delay(),
            Op::WaitKey(x) => return self.await_key(x),
            Op::SetDelay(x) => self.timers.arm_delay(v[x]),
            Op::SetSound(x) => return self.timers.arm_sound(v[x]),
            Op::AddIndex(x) => {
                let sum = self.state.i.wrapping_add(v[x] as u16);
                v[FLAG] = (sum > ADDRESS_MASK) as u8;
                self.state.i = sum & ADDRESS_MASK;
            }
            Op::Glyph(x) => self.state.i = font::glyph_address(self.font_offset, v[x]),
            Op::Decimal(x) => {
                let value = v[x];
                let i = self.state.i;
                let digits = [value / 100, value / 10 % 10, value % 10];
                for (k, digit) in digits.into_iter().enumerate() {
                    self.state.memory.write(i.wrapping_add(k as u16), digit);
                }
            }
            Op::Store(x) => {
                let i = self.state.i;
                for k in 0..=x {
                    let value = self.state.registers[k];
                    self.state.memory.write(i.wrapping_add(k as u16), value);
                }
                self.state.i = i.wrapping_add(x as u16 + 1) & ADDRESS_MASK;
            }
            Op::Restore(x) => {
                let i = self.state.i;
                for k in 0..=x {
                    self.state.registers[k] = self.state.memory.read(i.wrapping_add(k as u16));
                }
                self.state.i = i.wrapping_add(x as u16 + 1) & ADDRESS_MASK;
            }
        }
        if skip {
            self.state.skip();
        }
        Ok(())
    }

    /// `8XY1`..`8XY3`: VF is cleared as a side effect.
    fn logic(&mut self, x: usize, y: usize, f: impl Fn(u8, u8) -> u8) {
        let v = &mut self.state.registers;
        v[x] = f(v[x], v[y]);
        v[FLAG] = 0;
    }

    /// `Vx = Va - Vb`, VF = 1 unless the subtraction borrows.
    fn subtract(&mut self, x: usize, a: usize, b: usize) {
        let v = &mut self.state.registers;
        let (minuend, subtrahend) = (v[a], v[b]);
        v[FLAG] = (minuend >= subtrahend) as u8;
        v[x] = minuend.wrapping_sub(subtrahend);
    }

    fn clear_screen(&mut self) -> Result<()> {
        self.screen.clear();
        self.renderer.clear()?;
        if self.lazy_render {
            self.renderer.present(self.screen.frame())?;
        }
        Ok(())
    }

    fn draw_sprite(&mut self, x: usize, y: usize, n: u8) -> Result<()> {
        let i = self.state.i;
        let rows: Vec<u8> = (0..n as u16)
            .map(|k| self.state.memory.read(i.wrapping_add(k)))
            .collect();
        let (vx, vy) = (self.state.registers[x], self.state.registers[y]);
        self.state.registers[FLAG] = self.screen.draw(vx, vy, &rows);
        debug!(
            "Drew {n}-row sprite at ({vx}, {vy}) [collision: {}]",
            self.state.registers[FLAG]
        );
        if self.lazy_render {
            self.renderer.present(self.screen.frame())?;
        }
        Ok(())
    }

    fn await_key(&mut self, x: usize) -> Result<()> {
        match self.keypad.refresh() {
            Some(key) => {
                self.state.registers[x] = key;
                self.mode = Mode::Running;
            }
            None => self.mode = Mode::AwaitingKey(x),
        }
        Ok(())
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("cycles", &self.cycles)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingBuzzer, RecordingRenderer, ScriptedKeys};

    struct Rig {
        interpreter: Interpreter,
        renderer: RecordingRenderer,
        keys: ScriptedKeys,
        buzzer: CountingBuzzer,
    }

    fn rom(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    fn boot_with(config: Config, words: &[u16]) -> Rig {
        let renderer = RecordingRenderer::default();
        let keys = ScriptedKeys::default();
        let buzzer = CountingBuzzer::default();
        let timers = Arc::new(Timers::new(Box::new(buzzer.clone())));
        let interpreter = Interpreter::new(
            &config,
            &rom(words),
            Box::new(keys.clone()),
            Box::new(renderer.clone()),
            timers,
        )
        .unwrap()
        .with_rng(StdRng::seed_from_u64(0x8));
        Rig {
            interpreter,
            renderer,
            keys,
            buzzer,
        }
    }

    fn boot(words: &[u16]) -> Rig {
        boot_with(Config::default(), words)
    }

    fn run(interpreter: &mut Interpreter, steps: usize) {
        for _ in 0..steps {
            interpreter.step().unwrap();
        }
    }

    fn v(interpreter: &Interpreter, x: usize) -> u8 {
        interpreter.state().registers[x]
    }

    #[test]
    fn store_writes_registers_and_advances_index() {
        for x in 0..16u16 {
            let mut words: Vec<u16> = (0..=x).map(|r| 0x6000 | r << 8 | (0x10 + r)).collect();
            words.push(0xA300);
            words.push(0xF055 | x << 8);
            let mut rig = boot(&words);
            run(&mut rig.interpreter, words.len());
            let state = rig.interpreter.state();
            for r in 0..=x as usize {
                assert_eq!(state.memory[0x300 + r], state.registers[r]);
            }
            assert_eq!(state.i, 0x300 + x + 1);
        }
    }

    #[test]
    fn restore_reads_registers_and_advances_index() {
        let mut rig = boot(&[0xA206, 0xF265, 0x0000, 0xABCD, 0xEF00]);
        run(&mut rig.interpreter, 2);
        assert_eq!(v(&rig.interpreter, 0), 0xAB);
        assert_eq!(v(&rig.interpreter, 1), 0xCD);
        assert_eq!(v(&rig.interpreter, 2), 0xEF);
        assert_eq!(v(&rig.interpreter, 3), 0);
        assert_eq!(rig.interpreter.state().i, 0x209);
    }

    #[test]
    fn logic_ops_clear_flag() {
        for op in [0x8121, 0x8122, 0x8123] {
            let mut rig = boot(&[0x6FFF, 0x61F0, 0x620F, op]);
            run(&mut rig.interpreter, 4);
            assert_eq!(v(&rig.interpreter, FLAG), 0, "{op:04X}");
        }
        let mut rig = boot(&[0x61F0, 0x620F, 0x8121]);
        run(&mut rig.interpreter, 3);
        assert_eq!(v(&rig.interpreter, 1), 0xFF);
    }

    #[test]
    fn legacy_shift_reads_vy() {
        let mut rig = boot(&[0x61F0, 0x6203, 0x8126]);
        run(&mut rig.interpreter, 3);
        assert_eq!(v(&rig.interpreter, 1), 1);
        assert_eq!(v(&rig.interpreter, FLAG), 1);
        assert_eq!(v(&rig.interpreter, 2), 3);
    }

    #[test]
    fn new_shift_reads_vx() {
        let config = Config {
            new_shift: true,
            ..Config::default()
        };
        let mut rig = boot_with(config, &[0x61F0, 0x6203, 0x8126]);
        run(&mut rig.interpreter, 3);
        assert_eq!(v(&rig.interpreter, 1), 0x78);
        assert_eq!(v(&rig.interpreter, FLAG), 0);
        assert_eq!(v(&rig.interpreter, 2), 3);
    }

    #[test]
    fn shift_left_pops_high_bit() {
        let mut rig = boot(&[0x6281, 0x812E]);
        run(&mut rig.interpreter, 2);
        assert_eq!(v(&rig.interpreter, 1), 0x02);
        assert_eq!(v(&rig.interpreter, FLAG), 1);
    }

    #[test]
    fn add_sets_carry() {
        let mut rig = boot(&[0x61F0, 0x6220, 0x8124, 0x8124]);
        run(&mut rig.interpreter, 3);
        assert_eq!(v(&rig.interpreter, 1), 0x10);
        assert_eq!(v(&rig.interpreter, FLAG), 1);
        run(&mut rig.interpreter, 1);
        assert_eq!(v(&rig.interpreter, 1), 0x30);
        assert_eq!(v(&rig.interpreter, FLAG), 0);
    }

    #[test]
    fn subtraction_flags_not_borrow() {
        let mut rig = boot(&[0x6105, 0x6205, 0x8125, 0x8125]);
        run(&mut rig.interpreter, 3);
        assert_eq!(v(&rig.interpreter, 1), 0);
        assert_eq!(v(&rig.interpreter, FLAG), 1);
        run(&mut rig.interpreter, 1);
        assert_eq!(v(&rig.interpreter, 1), 0xFB);
        assert_eq!(v(&rig.interpreter, FLAG), 0);

        let mut rig = boot(&[0x6103, 0x6208, 0x8127]);
        run(&mut rig.interpreter, 3);
        assert_eq!(v(&rig.interpreter, 1), 5);
        assert_eq!(v(&rig.interpreter, FLAG), 1);
    }

    #[test]
    fn add_immediate_wraps_without_flag() {
        let mut rig = boot(&[0x61FF, 0x7102]);
        run(&mut rig.interpreter, 2);
        assert_eq!(v(&rig.interpreter, 1), 1);
        assert_eq!(v(&rig.interpreter, FLAG), 0);
    }

    #[test]
    fn add_index_overflow_masks_and_flags() {
        let mut rig = boot(&[0xAFFF, 0x6101, 0xF11E]);
        run(&mut rig.interpreter, 3);
        assert_eq!(v(&rig.interpreter, FLAG), 1);
        assert_eq!(rig.interpreter.state().i, 0x000);
    }

    #[test]
    fn skips_advance_past_next_instruction() {
        let mut rig = boot(&[0x6107, 0x3107, 0x0000, 0x4107, 0x9120, 0x0000, 0x5120]);
        run(&mut rig.interpreter, 2);
        assert_eq!(rig.interpreter.state().pc, 0x206);
        run(&mut rig.interpreter, 1);
        assert_eq!(rig.interpreter.state().pc, 0x208);
        run(&mut rig.interpreter, 1);
        assert_eq!(rig.interpreter.state().pc, 0x20C);
        run(&mut rig.interpreter, 1);
        assert_eq!(rig.interpreter.state().pc, 0x20E);
    }

    #[test]
    fn call_and_return() {
        let mut rig = boot(&[0x2206, 0x6142, 0x0000, 0x6107, 0x00EE]);
        run(&mut rig.interpreter, 1);
        assert_eq!(rig.interpreter.state().pc, 0x206);
        assert_eq!(rig.interpreter.state().sp, 1);
        run(&mut rig.interpreter, 2);
        assert_eq!(rig.interpreter.state().pc, 0x202);
        run(&mut rig.interpreter, 1);
        assert_eq!(v(&rig.interpreter, 1), 0x42);
    }

    #[test]
    fn return_on_empty_stack_is_reported() {
        let mut rig = boot(&[0x00EE]);
        assert!(matches!(
            rig.interpreter.step(),
            Err(Error::StackUnderflow { .. })
        ));
        assert_eq!(rig.interpreter.state().pc, 0x202);
    }

    #[test]
    fn jump_with_offset_is_masked() {
        let mut rig = boot(&[0x6010, 0xBFF8]);
        run(&mut rig.interpreter, 2);
        assert_eq!(rig.interpreter.state().pc, 0x008);
    }

    #[test]
    fn random_respects_mask() {
        let mut rig = boot(&[0xC100, 0xC20F, 0xC20F, 0xC20F]);
        run(&mut rig.interpreter, 4);
        assert_eq!(v(&rig.interpreter, 1), 0);
        assert!(v(&rig.interpreter, 2) <= 0x0F);
    }

    #[test]
    fn decimal_digits_at_index() {
        let mut rig = boot(&[0x61FE, 0xA400, 0xF133]);
        run(&mut rig.interpreter, 3);
        assert_eq!(rig.interpreter.state().memory[0x400..0x403], [2, 5, 4]);
        assert_eq!(rig.interpreter.state().i, 0x400);
    }

    #[test]
    fn glyph_address_uses_font_offset() {
        let mut rig = boot(&[0x611A, 0xF129]);
        run(&mut rig.interpreter, 2);
        assert_eq!(rig.interpreter.state().i, 0x50 + 5 * 0xA);
    }

    #[test]
    fn unknown_instruction_is_reported_after_pc_advance() {
        let mut rig = boot(&[0x8128, 0x6105]);
        let err = rig.interpreter.step().unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownInstruction {
                word: 0x8128,
                addr: 0x200
            }
        ));
        assert_eq!(rig.interpreter.state().pc, 0x202);
        run(&mut rig.interpreter, 1);
        assert_eq!(v(&rig.interpreter, 1), 5);
    }

    #[test]
    fn draw_sets_collision_flag() {
        let mut rig = boot(&[0xA050, 0xD015, 0xD015]);
        run(&mut rig.interpreter, 2);
        assert_eq!(v(&rig.interpreter, FLAG), 0);
        assert!(rig.interpreter.screen().pixel(0, 0));
        run(&mut rig.interpreter, 1);
        assert_eq!(v(&rig.interpreter, FLAG), 1);
        assert_eq!(rig.interpreter.screen(), &Screen::new());
    }

    #[test]
    fn lazy_render_presents_on_screen_changes_only() {
        let config = Config {
            lazy_render: true,
            ..Config::default()
        };
        let mut rig = boot_with(config, &[0x00E0, 0x6001, 0xA050, 0xD015]);
        run(&mut rig.interpreter, 1);
        assert_eq!(rig.renderer.presents(), 1);
        assert_eq!(rig.renderer.clears(), 1);
        run(&mut rig.interpreter, 2);
        assert_eq!(rig.renderer.presents(), 1);
        run(&mut rig.interpreter, 1);
        assert_eq!(rig.renderer.presents(), 2);
        assert!(rig.renderer.last().unwrap()[1]);
    }

    #[test]
    fn periodic_refresh_every_interval() {
        let mut rig = boot(&[0x1200]);
        run(&mut rig.interpreter, 41);
        assert_eq!(rig.renderer.presents(), 3);
    }

    #[test]
    fn clear_then_jump_to_self_loops() {
        let mut rig = boot(&[0x00E0, 0x1202]);
        run(&mut rig.interpreter, 1000);
        assert_eq!(rig.interpreter.state().pc, 0x202);
        assert_eq!(rig.interpreter.screen(), &Screen::new());
        assert_eq!(rig.renderer.clears(), 1);
    }

    #[test]
    fn wait_key_holds_until_new_press() {
        let mut rig = boot(&[0xF30A, 0x6142]);
        rig.keys.set(&[0x7]);
        rig.interpreter.keypad.refresh();
        run(&mut rig.interpreter, 1);
        assert_eq!(rig.interpreter.mode(), Mode::AwaitingKey(3));
        assert_eq!(rig.interpreter.state().pc, 0x202);
        run(&mut rig.interpreter, 5);
        assert_eq!(rig.interpreter.mode(), Mode::AwaitingKey(3));
        assert_eq!(v(&rig.interpreter, 1), 0);
        rig.keys.set(&[0x7, 0xB]);
        run(&mut rig.interpreter, 1);
        assert_eq!(rig.interpreter.mode(), Mode::Running);
        assert_eq!(v(&rig.interpreter, 3), 0xB);
        run(&mut rig.interpreter, 1);
        assert_eq!(v(&rig.interpreter, 1), 0x42);
    }

    #[test]
    fn key_skips_refresh_on_demand() {
        let mut rig = boot(&[0x6104, 0xE19E, 0x0000, 0xE1A1, 0x0000]);
        rig.keys.set(&[0x4]);
        run(&mut rig.interpreter, 2);
        assert_eq!(rig.interpreter.state().pc, 0x206);
        run(&mut rig.interpreter, 1);
        assert_eq!(rig.interpreter.state().pc, 0x208);
    }

    #[test]
    fn timer_instructions() {
        let mut rig = boot(&[0x6178, 0xF115, 0xF118, 0xF207]);
        run(&mut rig.interpreter, 3);
        assert_eq!(rig.buzzer.starts(), 1);
        assert_eq!(rig.interpreter.timers().sound(), 0x78);
        rig.interpreter.timers().tick().unwrap();
        run(&mut rig.interpreter, 1);
        assert_eq!(v(&rig.interpreter, 2), 0x77);
    }
}
