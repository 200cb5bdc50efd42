pub mod scheduler;
pub mod status;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::dsp::distortion::soft_limit;
use crate::dsp::lfo::LfoBank;
use crate::dsp::oscillator::sine_table;
use crate::effects::EffectsChain;
use crate::error::{QueueKind, QueueOverflow};
use crate::io::midi::{MidiEvent, MidiEventKind, MidiParser, RunningStatusScope};
use crate::io::queue::{
    EventQueue, QueueStats, DEFAULT_MIDI_CAPACITY, DEFAULT_PARAM_CAPACITY, DEFAULT_SEQ_CAPACITY,
};
use crate::patch::{ParamGroup, Patch};
use crate::synth::allocator::VoiceAllocator;
use crate::synth::arpeggiator::{ArpAction, Arpeggiator};
use crate::synth::message::{EventSink, ParamId, ParamMsg, ParamValue, SeqEvent};
use crate::synth::modulation::{ModMatrix, ModSource, ModSources, CONTROL_PERIOD};
use crate::synth::voice::RenderCtx;
use crate::{MAX_BLOCK_SIZE, MAX_LFO, WAVETABLE_SIZE};

use self::scheduler::{Scheduler, Trigger};
pub use self::status::{EngineStatus, StatusMonitor};
use self::status::{status_channel, StatusPublisher};

/*
Synth Engine
============

The engine owns every piece of audio state: the patch, the voice pool, the
modulation matrix, the LFO bank, the effects chain, the arpeggiator and the
sequencer schedule. Control threads never touch it directly. They hold an
EngineHandle and talk through three bounded queues.

    EngineHandle ──params──┐
    EngineHandle ──midi────┼──► SynthEngine::process ──► interleaved L/R
    EngineHandle ──seq─────┘            │
                                        └──status──► StatusMonitor


Block Order
-----------

  1. drain params   apply to the patch, then push changed groups into the
                    voices, LFOs, matrix, effects or arpeggiator
  2. drain MIDI     notes go to the allocator, or to the arpeggiator while
                    it runs; CC 1 mod wheel, CC 123 all notes off
  3. drain seq      into the sorted pending schedule
  4. render         voices in segments, the LFO bank rendered ahead of
                    each one in control periods
  5. effects        distortion, chorus, delay, reverb, compressor
  6. master         volume, then tanh soft limit
  7. output         interleave into the caller's buffer, publish status


Segments
--------

Sequencer events and arpeggiator steps land on exact frames. The block is
cut into segments at every such frame: render up to it, fire the trigger,
carry on. MIDI and parameter changes take effect at the start of the block.
A trigger that key-syncs an LFO restarts it on the trigger frame, since the
bank is only rendered up to the segment being played.

    frame   0         90            200               255
            |─────────|─────────────|─────────────────|
                      seq note-on   arp note-off

Nothing on this path allocates, locks, or logs. Every buffer is sized at
construction for the largest block.
*/

const CC_MOD_WHEEL: u8 = 1;
const CC_ALL_SOUND_OFF: u8 = 120;
const CC_RESET_CONTROLLERS: u8 = 121;
const CC_ALL_NOTES_OFF: u8 = 123;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Largest block rendered in one pass; bigger requests are split.
    pub max_block_frames: usize,
    pub param_capacity: usize,
    pub midi_capacity: usize,
    pub seq_capacity: usize,
    pub running_status: RunningStatusScope,
    /// Seed for noise, drift, random mod source and the arpeggiator.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_block_frames: 256,
            param_capacity: DEFAULT_PARAM_CAPACITY,
            midi_capacity: DEFAULT_MIDI_CAPACITY,
            seq_capacity: DEFAULT_SEQ_CAPACITY,
            running_status: RunningStatusScope::Stream,
            seed: 0x5EED_0F_5157,
        }
    }
}

struct Queues {
    params: EventQueue<ParamMsg>,
    midi: EventQueue<MidiEvent>,
    seq: EventQueue<SeqEvent>,
}

impl Queues {
    fn new(config: &EngineConfig) -> Self {
        Self {
            params: EventQueue::new(QueueKind::Param, config.param_capacity),
            midi: EventQueue::new(QueueKind::Midi, config.midi_capacity),
            seq: EventQueue::new(QueueKind::Seq, config.seq_capacity),
        }
    }
}

impl Clone for Queues {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            midi: self.midi.clone(),
            seq: self.seq.clone(),
        }
    }
}

/// Parameter groups changed since the last sync.
#[derive(Debug, Clone, Copy, Default)]
struct Dirty {
    voices: bool,
    lfos: bool,
    matrix: bool,
    effects: bool,
    arp: bool,
}

impl Dirty {
    fn all() -> Self {
        Self {
            voices: true,
            lfos: true,
            matrix: true,
            effects: true,
            arp: true,
        }
    }
}

/// Everything the event handlers and the renderer mutate.
struct EngineState {
    sample_rate: f32,
    patch: Patch,
    allocator: VoiceAllocator,
    matrix: ModMatrix,
    lfos: LfoBank,
    effects: EffectsChain,
    arp: Arpeggiator,
    arp_running: bool,
    scheduler: Scheduler,
    rng: SmallRng,
    arp_rng: SmallRng,
    wavetable: Vec<f32>,
    mod_wheel: f32,
    aftertouch: f32,
    /// Pitch wheel position in [-1, 1).
    bend: f32,
    /// Keys currently down, one bit per note number.
    held: u128,
    frame: u64,
    dirty: Dirty,
}

impl EngineState {
    fn new(config: &EngineConfig) -> Self {
        let mut state = Self {
            sample_rate: config.sample_rate,
            patch: Patch::default(),
            allocator: VoiceAllocator::new(config.sample_rate),
            matrix: ModMatrix::new(),
            lfos: LfoBank::new(),
            effects: EffectsChain::new(config.sample_rate),
            arp: Arpeggiator::new(),
            arp_running: false,
            scheduler: Scheduler::new(config.seq_capacity),
            rng: SmallRng::seed_from_u64(config.seed),
            arp_rng: SmallRng::seed_from_u64(config.seed.wrapping_add(1)),
            wavetable: sine_table(WAVETABLE_SIZE),
            mod_wheel: 0.0,
            aftertouch: 0.0,
            bend: 0.0,
            held: 0,
            frame: 0,
            dirty: Dirty::all(),
        };
        state.sync();
        state
    }

    /// Push changed parameter groups from the patch into the running state.
    fn sync(&mut self) {
        let dirty = std::mem::take(&mut self.dirty);

        if dirty.voices {
            self.allocator.configure(&self.patch);
        }
        if dirty.lfos {
            for (index, settings) in self.patch.lfos.iter().enumerate() {
                if let Some(target) = self.lfos.settings_mut(index) {
                    *target = *settings;
                }
            }
        }
        if dirty.matrix {
            for (index, slot) in self.patch.mod_slots.iter().enumerate() {
                self.matrix.set_slot(index, *slot);
            }
        }
        if dirty.effects {
            self.effects.configure(&self.patch.effects, self.patch.tempo);
        }
        if dirty.arp {
            let running = self.patch.arp.is_running();
            if running != self.arp_running {
                self.held = 0;
                if running {
                    self.allocator.all_notes_off();
                } else {
                    let allocator = &mut self.allocator;
                    self.arp.clear(&mut |action: ArpAction| {
                        if let ArpAction::NoteOff { note } = action {
                            allocator.note_off(note);
                        }
                    });
                }
                self.arp_running = running;
            }
        }
    }

    fn key_down(&mut self, note: u8, velocity: u8) {
        let note = note.min(127);
        let first_key = self.held == 0;
        self.held |= 1u128 << note;
        self.lfos.note_on(first_key);

        if self.arp_running {
            self.arp.note_on(note, velocity);
        } else {
            let glide = self.patch.glide_time > 0.0;
            self.allocator.note_on(note, velocity, glide, &mut self.rng);
        }
    }

    fn key_up(&mut self, note: u8) {
        let note = note.min(127);
        self.held &= !(1u128 << note);

        if self.arp_running {
            self.arp.note_off(note);
        } else {
            self.allocator.note_off(note);
        }
    }

    fn all_notes_off(&mut self) {
        self.held = 0;
        let allocator = &mut self.allocator;
        self.arp.clear(&mut |action: ArpAction| {
            if let ArpAction::NoteOff { note } = action {
                allocator.note_off(note);
            }
        });
        self.allocator.all_notes_off();
        self.scheduler.clear_note_offs();
    }

    fn control_change(&mut self, controller: u8, value: u8) {
        match controller {
            CC_MOD_WHEEL => self.mod_wheel = value as f32 / 127.0,
            CC_RESET_CONTROLLERS => {
                self.mod_wheel = 0.0;
                self.aftertouch = 0.0;
                self.bend = 0.0;
            }
            CC_ALL_SOUND_OFF | CC_ALL_NOTES_OFF => self.all_notes_off(),
            _ => {}
        }
    }

    fn trigger(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::NoteOn { note, velocity } if velocity > 0 => self.key_down(note, velocity),
            Trigger::NoteOn { note, .. } | Trigger::NoteOff { note } => self.key_up(note),
        }
    }

    /// Fire every sequencer trigger and arpeggiator step due at `frame`.
    fn fire_due(&mut self, frame: u64) {
        while let Some(trigger) = self.scheduler.pop_due(frame) {
            self.trigger(trigger);
        }

        if self.arp_running {
            let glide = self.patch.glide_time > 0.0;
            let allocator = &mut self.allocator;
            let rng = &mut self.rng;
            self.arp.poll(
                &self.patch.arp,
                self.sample_rate,
                self.patch.tempo,
                &mut self.arp_rng,
                &mut |action: ArpAction| match action {
                    ArpAction::NoteOn { note, velocity } => {
                        allocator.note_on(note, velocity, glide, rng);
                    }
                    ArpAction::NoteOff { note } => allocator.note_off(note),
                },
            );
        }
    }

    /// Frames from `offset` to the next scheduled trigger, capped at `frames`.
    fn segment_end(&self, offset: usize, frames: usize) -> usize {
        let now = self.frame + offset as u64;
        let remaining = (frames - offset) as u64;
        let mut gap = remaining;

        if let Some(next) = self.scheduler.next_frame() {
            gap = gap.min(next.saturating_sub(now).max(1));
        }
        if self.arp_running {
            if let Some(until) = self.arp.frames_until_action() {
                gap = gap.min(until.max(1));
            }
        }
        offset + gap as usize
    }

    /// Bring the LFO bank up to frame `end` of the current block, one
    /// control period at a time. LFO-rate routings read the values the bank
    /// produced at the end of the previous period.
    fn render_lfos(&mut self, end: usize) {
        while self.lfos.rendered() < end {
            let start = self.lfos.rendered();
            let len = (CONTROL_PERIOD - start % CONTROL_PERIOD).min(end - start);

            let mut globals = ModSources::new();
            globals.set_lfos(self.lfos.snapshot());
            globals.set(ModSource::ModWheel, self.mod_wheel);
            globals.set(ModSource::Aftertouch, self.aftertouch);
            let rate_scales = self.matrix.lfo_rate_scales(&globals);
            self.lfos.render(
                len,
                self.patch.tempo,
                rate_scales,
                self.sample_rate,
                &mut self.rng,
            );
            if self.lfos.rendered() == start {
                break;
            }
        }
    }

    /// Render one block of voices and effects into split buffers.
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        left.fill(0.0);
        right.fill(0.0);

        self.lfos.begin_block();
        self.allocator.begin_block(&mut self.rng);

        let mut offset = 0;
        while offset < frames {
            self.fire_due(self.frame + offset as u64);
            let end = self.segment_end(offset, frames);
            self.render_lfos(end);

            let ctx = RenderCtx {
                sample_rate: self.sample_rate,
                patch: &self.patch,
                matrix: &self.matrix,
                lfos: &self.lfos,
                mod_wheel: self.mod_wheel,
                aftertouch: self.aftertouch,
                bend_semitones: self.bend * self.patch.pitch_bend_range as f32,
                wavetable: &self.wavetable,
            };
            self.allocator.render(
                &mut left[offset..end],
                &mut right[offset..end],
                offset,
                &ctx,
                &mut self.rng,
            );

            if self.arp_running {
                self.arp.advance((end - offset) as u64);
            }
            offset = end;
        }

        self.effects.process(&mut left[..frames], &mut right[..frames]);
        self.frame += frames as u64;
    }
}

impl EventSink<ParamMsg> for EngineState {
    fn dispatch(&mut self, msg: ParamMsg) {
        if msg.id == ParamId::Panic {
            self.all_notes_off();
            return;
        }
        if !self.patch.apply(msg) {
            return;
        }
        match msg.id.group() {
            // Tempo moves synced delay times
            ParamGroup::Global => self.dirty.effects = true,
            ParamGroup::Voice => self.dirty.voices = true,
            ParamGroup::Lfo => self.dirty.lfos = true,
            ParamGroup::Matrix => self.dirty.matrix = true,
            ParamGroup::Effects => self.dirty.effects = true,
            ParamGroup::Arp => self.dirty.arp = true,
        }
    }
}

impl EventSink<MidiEvent> for EngineState {
    fn dispatch(&mut self, event: MidiEvent) {
        match event.kind {
            MidiEventKind::NoteOn if event.data2 > 0 => self.key_down(event.data1, event.data2),
            MidiEventKind::NoteOn | MidiEventKind::NoteOff => self.key_up(event.data1),
            MidiEventKind::ControlChange => self.control_change(event.data1, event.data2),
            MidiEventKind::PitchBend => self.bend = event.bend_amount(),
            MidiEventKind::ChannelPressure => self.aftertouch = event.data1 as f32 / 127.0,
            MidiEventKind::PolyPressure => self.aftertouch = event.data2 as f32 / 127.0,
            MidiEventKind::ProgramChange => {}
        }
    }
}

impl EventSink<SeqEvent> for EngineState {
    fn dispatch(&mut self, event: SeqEvent) {
        self.scheduler.schedule(event);
    }
}

/// The audio-thread side of the synth. Call `process` from the output
/// callback; everything else is for setup before the stream starts.
pub struct SynthEngine {
    config: EngineConfig,
    block_frames: usize,
    queues: Queues,
    state: EngineState,
    status: StatusPublisher,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl SynthEngine {
    pub fn new(mut config: EngineConfig) -> (SynthEngine, EngineHandle, StatusMonitor) {
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            tracing::warn!(
                sample_rate = config.sample_rate,
                "invalid sample rate, using the default"
            );
            config.sample_rate = EngineConfig::default().sample_rate;
        }
        let block_frames = config.max_block_frames.clamp(1, MAX_BLOCK_SIZE);
        let queues = Queues::new(&config);
        let (status, monitor) = status_channel();

        tracing::debug!(
            sample_rate = config.sample_rate,
            block_frames,
            seed = config.seed,
            "synth engine created"
        );

        let handle = EngineHandle {
            queues: queues.clone(),
            parser: MidiParser::new(config.running_status),
        };
        let engine = SynthEngine {
            config,
            block_frames,
            state: EngineState::new(&config),
            queues,
            status,
            left: vec![0.0; block_frames],
            right: vec![0.0; block_frames],
        };
        (engine, handle, monitor)
    }

    /// Render `frames` frames of interleaved stereo into `out`.
    /// `frames` is capped by the buffer length.
    pub fn process(&mut self, out: &mut [f32], frames: usize) {
        let frames = frames.min(out.len() / 2);
        let mut done = 0;
        while done < frames {
            let count = (frames - done).min(self.block_frames);
            self.render_block(&mut out[done * 2..(done + count) * 2]);
            done += count;
        }
    }

    fn render_block(&mut self, out: &mut [f32]) {
        let frames = out.len() / 2;

        self.queues.params.drain(&mut self.state);
        self.state.sync();
        self.queues.midi.drain(&mut self.state);
        self.queues.seq.drain(&mut self.state);

        let left = &mut self.left[..frames];
        let right = &mut self.right[..frames];
        self.state.render(left, right);

        let volume = self.state.patch.master_volume;
        let mut peak = 0.0_f32;
        for (frame, (l, r)) in out.chunks_exact_mut(2).zip(left.iter().zip(right.iter())) {
            frame[0] = soft_limit(l * volume);
            frame[1] = soft_limit(r * volume);
            peak = peak.max(frame[0].abs()).max(frame[1].abs());
        }

        self.status.publish(EngineStatus {
            frame: self.state.frame,
            active_voices: self.state.allocator.active_voices(),
            peak,
            seq_dropped: self.state.scheduler.dropped(),
        });
    }

    pub fn patch(&self) -> &Patch {
        &self.state.patch
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f32 {
        self.state.sample_rate
    }

    /// Frames rendered since creation.
    pub fn frame(&self) -> u64 {
        self.state.frame
    }

    pub fn active_voices(&self) -> usize {
        self.state.allocator.active_voices()
    }

    pub fn allocator(&self) -> &VoiceAllocator {
        &self.state.allocator
    }

    pub fn arpeggiator(&self) -> &Arpeggiator {
        &self.state.arp
    }

    /// LFO values at the last frame rendered.
    pub fn lfo_values(&self) -> [f32; MAX_LFO] {
        self.state.lfos.snapshot()
    }

    /// Re-target the engine at a new device rate. Not real-time safe: call
    /// before the stream starts.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate == self.state.sample_rate || !(sample_rate.is_finite() && sample_rate > 0.0) {
            return;
        }
        self.config.sample_rate = sample_rate;
        self.state.sample_rate = sample_rate;
        self.state.allocator.set_sample_rate(sample_rate);
        self.state.effects = EffectsChain::new(sample_rate);
        self.state.dirty.effects = true;
        self.state.sync();
    }

    /// Replace the single-cycle table read by the wavetable waveform.
    /// Empty tables are ignored. Not real-time safe.
    pub fn set_wavetable(&mut self, table: Vec<f32>) {
        if !table.is_empty() {
            self.state.wavetable = table;
        }
    }
}

/// Producer-side handle. Clone one per control thread.
///
/// Each clone decodes raw MIDI bytes with its own parser, so running status
/// never leaks between independent byte streams.
pub struct EngineHandle {
    queues: Queues,
    parser: MidiParser,
}

impl Clone for EngineHandle {
    fn clone(&self) -> Self {
        Self {
            queues: self.queues.clone(),
            parser: MidiParser::new(self.parser.scope()),
        }
    }
}

impl EngineHandle {
    pub fn push_param(
        &self,
        id: ParamId,
        value: impl Into<ParamValue>,
    ) -> Result<(), QueueOverflow> {
        self.queues.params.push(ParamMsg::new(id, value))
    }

    pub fn push_midi_event(&self, event: MidiEvent) -> Result<(), QueueOverflow> {
        self.queues.midi.push(event)
    }

    pub fn push_seq_event(&self, event: SeqEvent) -> Result<(), QueueOverflow> {
        self.queues.seq.push(event)
    }

    pub fn note_on(&self, note: u8, velocity: u8) -> Result<(), QueueOverflow> {
        self.push_midi_event(MidiEvent::note_on(0, note, velocity))
    }

    pub fn note_off(&self, note: u8) -> Result<(), QueueOverflow> {
        self.push_midi_event(MidiEvent::note_off(0, note, 0))
    }

    /// Release every voice at the start of the next block.
    pub fn all_notes_off(&self) -> Result<(), QueueOverflow> {
        self.push_param(ParamId::Panic, true)
    }

    /// Decode raw MIDI bytes and enqueue the complete messages. Returns how
    /// many were enqueued; messages that find the queue full are dropped.
    pub fn feed_midi_bytes(&mut self, bytes: &[u8]) -> usize {
        let midi = &self.queues.midi;
        let mut enqueued = 0;
        self.parser.feed(bytes, &mut |event: MidiEvent| {
            if midi.push(event).is_ok() {
                enqueued += 1;
            }
        });
        enqueued
    }

    /// Queue every parameter of `patch`. Stops at the first overflow.
    pub fn push_patch(&self, patch: &Patch) -> Result<(), QueueOverflow> {
        for msg in patch.to_messages() {
            self.queues.params.push(msg)?;
        }
        Ok(())
    }

    pub fn queue_stats(&self, kind: QueueKind) -> QueueStats {
        match kind {
            QueueKind::Param => self.queues.params.stats(),
            QueueKind::Midi => self.queues.midi.stats(),
            QueueKind::Seq => self.queues.seq.stats(),
        }
    }
}
