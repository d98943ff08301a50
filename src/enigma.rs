//! The M3 machine itself: wheels, reflectors, plugboard, and the
//! [`Enigma`]/[`Key`] pair the search phases trade back and forth.

use std::fmt::{self, Display};

/// The five wheel types issued with the three-rotor naval machine.
///
/// "Wheel" is the type; a [`Rotor`] is a wheel sitting in a slot with its
/// own ring setting and position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WheelId {
    I = 0,
    II = 1,
    III = 2,
    IV = 3,
    V = 4,
}

const WHEEL_LETTERS: [&[u8; 26]; 5] = [
    b"EKMFLGDQVZNTOWYHXUSPAIBRCJ",
    b"AJDKSIRUXBLHWTMCQGZNPYFVOE",
    b"BDFHJLCPRTXVZNYEIWGAKMUSQO",
    b"ESOVPZJAYQUIRHXLNFTGKDCMWB",
    b"VZBRGITYUPSDNHLXAWMJQOFECK",
];

// The wirings are fixed historical constants, so the permutation tables and
// their inverses are built at compile time from the letter strings above.
const fn decode_wiring(letters: &[u8; 26]) -> [u8; 26] {
    let mut wiring = [0u8; 26];
    let mut i = 0;
    while i < 26 {
        wiring[i] = letters[i] - b'A';
        i += 1;
    }
    wiring
}

const fn invert_wiring(wiring: &[u8; 26]) -> [u8; 26] {
    let mut inverse = [0u8; 26];
    let mut i = 0;
    while i < 26 {
        inverse[wiring[i] as usize] = i as u8;
        i += 1;
    }
    inverse
}

const WHEEL_FORWARD: [[u8; 26]; 5] = [
    decode_wiring(WHEEL_LETTERS[0]),
    decode_wiring(WHEEL_LETTERS[1]),
    decode_wiring(WHEEL_LETTERS[2]),
    decode_wiring(WHEEL_LETTERS[3]),
    decode_wiring(WHEEL_LETTERS[4]),
];

const WHEEL_BACKWARD: [[u8; 26]; 5] = [
    invert_wiring(&WHEEL_FORWARD[0]),
    invert_wiring(&WHEEL_FORWARD[1]),
    invert_wiring(&WHEEL_FORWARD[2]),
    invert_wiring(&WHEEL_FORWARD[3]),
    invert_wiring(&WHEEL_FORWARD[4]),
];

impl WheelId {
    /// Every wheel in the box, in issue order.
    pub const ALL: [WheelId; 5] = [
        WheelId::I,
        WheelId::II,
        WheelId::III,
        WheelId::IV,
        WheelId::V,
    ];

    /// Position at which this wheel carries the next rotor over.
    pub fn turnover(self) -> u8 {
        match self {
            WheelId::I => 16,    // Q
            WheelId::II => 4,    // E
            WheelId::III => 21,  // V
            WheelId::IV => 9,    // J
            WheelId::V => 25,    // Z
        }
    }

    /// Look a wheel up by its Roman-numeral name. Panics on anything else.
    pub fn from_name(name: &str) -> Self {
        match name {
            "I" => WheelId::I,
            "II" => WheelId::II,
            "III" => WheelId::III,
            "IV" => WheelId::IV,
            "V" => WheelId::V,
            _ => panic!("unknown wheel name: {name:?}"),
        }
    }

    fn forward_wiring(self) -> &'static [u8; 26] {
        &WHEEL_FORWARD[self as usize]
    }

    fn backward_wiring(self) -> &'static [u8; 26] {
        &WHEEL_BACKWARD[self as usize]
    }
}

impl Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WheelId::I => "I",
            WheelId::II => "II",
            WheelId::III => "III",
            WheelId::IV => "IV",
            WheelId::V => "V",
        };
        f.write_str(name)
    }
}

/// The two reflectors fitted to the M3. Both are involutions with no
/// fixed point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReflectorId {
    B = 0,
    C = 1,
}

const REFLECTOR_WIRING: [[u8; 26]; 2] = [
    decode_wiring(b"YRUHQSLDPXNGOKMIEBFZCWVJAT"),
    decode_wiring(b"RDOBJNTKVEHMLFCWZAXGYIPSUQ"),
];

impl ReflectorId {
    /// Look a reflector up by name ("B" or "C"). Panics on anything else.
    pub fn from_name(name: &str) -> Self {
        match name {
            "B" => ReflectorId::B,
            "C" => ReflectorId::C,
            _ => panic!("unknown reflector name: {name:?}"),
        }
    }

    fn reflect(self, c: u8) -> u8 {
        REFLECTOR_WIRING[self as usize][c as usize]
    }
}

/// A wheel in a slot: wiring plus ring setting, current position, and the
/// remembered initial position that [`Rotor::reset_position`] restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotor {
    wheel: WheelId,
    ring: u8,
    position: u8,
    initial_position: u8,
}

impl Rotor {
    pub fn new(wheel: WheelId, ring: u8, position: u8) -> Self {
        assert!(ring < 26, "ring setting out of range: {ring}");
        assert!(position < 26, "rotor position out of range: {position}");

        Self {
            wheel,
            ring,
            position,
            initial_position: position,
        }
    }

    pub fn wheel(&self) -> WheelId {
        self.wheel
    }

    pub fn ring(&self) -> u8 {
        self.ring
    }

    pub fn position(&self) -> u8 {
        self.position
    }

    /// The position this rotor returns to on reset.
    pub fn initial_position(&self) -> u8 {
        self.initial_position
    }

    /// Swap the wheel in this slot. Ring and position are kept.
    pub fn set_wheel(&mut self, wheel: WheelId) {
        self.wheel = wheel;
    }

    pub fn set_ring(&mut self, ring: u8) {
        assert!(ring < 26, "ring setting out of range: {ring}");
        self.ring = ring;
    }

    /// Set the current position. The remembered initial position follows,
    /// so a later reset comes back here.
    pub fn set_position(&mut self, position: u8) {
        assert!(position < 26, "rotor position out of range: {position}");
        self.position = position;
        self.initial_position = position;
    }

    /// Restore the remembered initial position. Wiring is untouched.
    pub fn reset_position(&mut self) {
        self.position = self.initial_position;
    }

    /// Advance one step.
    pub fn turn(&mut self) {
        self.position = if self.position == 25 {
            0
        } else {
            self.position + 1
        };
    }

    /// True when the next advance past this position carries the
    /// neighbouring rotor over.
    pub fn at_turnover(&self) -> bool {
        self.position == self.wheel.turnover()
    }

    // The innermost function of the whole search: six lookups per letter,
    // hundreds of millions of letters per scan. The offset can go negative,
    // so both subtractions carry the wrap branch rather than a signed `%`
    // (which yields negative residues).
    #[inline]
    fn map(c: u8, position: u8, ring: u8, wiring: &[u8; 26]) -> u8 {
        let offset = if position >= ring {
            position - ring
        } else {
            position + 26 - ring
        };

        let shifted = c + offset;
        let shifted = if shifted < 26 { shifted } else { shifted - 26 };

        let out = wiring[shifted as usize];
        if out >= offset {
            out - offset
        } else {
            out + 26 - offset
        }
    }

    /// Wiring lookup, entry side. `c` must be in 0..26.
    #[inline]
    pub fn forward(&self, c: u8) -> u8 {
        Self::map(c, self.position, self.ring, self.wheel.forward_wiring())
    }

    /// Wiring lookup, return side. `c` must be in 0..26.
    #[inline]
    pub fn backward(&self, c: u8) -> u8 {
        Self::map(c, self.position, self.ring, self.wheel.backward_wiring())
    }
}

/// The Steckerbrett: an involutive partial swap held as a flat table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plugboard {
    wiring: [u8; 26],
}

impl Plugboard {
    /// Build a plugboard from letter pairs. A pair of identical letters,
    /// a non-alphabetic character, or a letter appearing in two pairs is a
    /// programmer error.
    pub fn new(pairs: &[(char, char)]) -> Self {
        let mut wiring = identity();
        let mut plugged = [false; 26];

        for &(a, b) in pairs {
            if !a.is_ascii_alphabetic() || !b.is_ascii_alphabetic() {
                panic!("malformed plugboard pair: ({a:?}, {b:?})");
            }

            let a = a.to_ascii_uppercase() as u8 - b'A';
            let b = b.to_ascii_uppercase() as u8 - b'A';
            if a == b {
                panic!("plugboard pair connects a letter to itself: {:?}", (a + b'A') as char);
            }
            if plugged[a as usize] || plugged[b as usize] {
                panic!(
                    "plugboard letter already in use: ({}, {})",
                    (a + b'A') as char,
                    (b + b'A') as char
                );
            }

            plugged[a as usize] = true;
            plugged[b as usize] = true;
            wiring[a as usize] = b;
            wiring[b as usize] = a;
        }

        Self { wiring }
    }

    /// The board with no cables.
    pub fn identity() -> Self {
        Self { wiring: identity() }
    }

    #[inline]
    fn swap(&self, c: u8) -> u8 {
        self.wiring[c as usize]
    }

    /// Per-letter flags; true means the letter carries no cable.
    pub fn unplugged(&self) -> [bool; 26] {
        let mut free = [true; 26];
        for (i, &other) in self.wiring.iter().enumerate() {
            free[i] = i == other as usize;
        }
        free
    }

    pub fn wiring(&self) -> &[u8; 26] {
        &self.wiring
    }
}

impl Default for Plugboard {
    fn default() -> Self {
        Self::identity()
    }
}

fn identity() -> [u8; 26] {
    let mut wiring = [0u8; 26];
    for (i, w) in wiring.iter_mut().enumerate() {
        *w = i as u8;
    }
    wiring
}

/// A complete machine configuration: wheel order, ring settings, initial
/// positions, and plugboard pairs. Reflector B is implied.
///
/// Keys are immutable snapshots; the ordering is lexicographic on
/// (wheels, rings, positions, pairs) and serves as the deterministic
/// tie-breaker when two candidates score identically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    wheels: [WheelId; 3],
    rings: [u8; 3],
    positions: [u8; 3],
    pairs: Vec<(char, char)>,
}

impl Key {
    pub fn new(
        wheels: [WheelId; 3],
        rings: [u8; 3],
        positions: [u8; 3],
        pairs: Vec<(char, char)>,
    ) -> Self {
        assert!(rings.iter().all(|&r| r < 26), "ring setting out of range");
        assert!(
            positions.iter().all(|&p| p < 26),
            "rotor position out of range"
        );

        Self {
            wheels,
            rings,
            positions,
            pairs,
        }
    }

    /// Wheel order, index 0 leftmost.
    pub fn wheels(&self) -> [WheelId; 3] {
        self.wheels
    }

    pub fn rings(&self) -> [u8; 3] {
        self.rings
    }

    pub fn positions(&self) -> [u8; 3] {
        self.positions
    }

    pub fn pairs(&self) -> &[(char, char)] {
        &self.pairs
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} / {} {} {} / {} {} {}",
            self.wheels[0],
            self.wheels[1],
            self.wheels[2],
            self.rings[0],
            self.rings[1],
            self.rings[2],
            self.positions[0],
            self.positions[1],
            self.positions[2],
        )?;

        if !self.pairs.is_empty() {
            write!(f, " /")?;
            for (a, b) in &self.pairs {
                write!(f, " {a}{b}")?;
            }
        }

        Ok(())
    }
}

/// Keep only the letters of `text`, upper-cased. This is the cleaning rule
/// applied to every string crossing the system boundary.
pub fn letters(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// A three-rotor machine. Mutable workhorse: one instance is typically
/// reused across many trials, with [`Enigma::reset_positions`] called
/// between them.
#[derive(Debug, Clone)]
pub struct Enigma {
    left_rotor: Rotor,
    middle_rotor: Rotor,
    right_rotor: Rotor,
    reflector: ReflectorId,
    plugboard: Plugboard,
    pairs: Vec<(char, char)>,
}

impl Enigma {
    pub fn new(
        wheels: [WheelId; 3],
        rings: [u8; 3],
        positions: [u8; 3],
        reflector: ReflectorId,
        pairs: &[(char, char)],
    ) -> Self {
        Self {
            left_rotor: Rotor::new(wheels[0], rings[0], positions[0]),
            middle_rotor: Rotor::new(wheels[1], rings[1], positions[1]),
            right_rotor: Rotor::new(wheels[2], rings[2], positions[2]),
            reflector,
            plugboard: Plugboard::new(pairs),
            pairs: pairs.to_vec(),
        }
    }

    /// Rebuild the machine a key describes. The reflector defaults to B,
    /// which the key format implies.
    pub fn from_key(key: &Key) -> Self {
        Self::new(
            key.wheels(),
            key.rings(),
            key.positions(),
            ReflectorId::B,
            key.pairs(),
        )
    }

    /// Snapshot the current configuration. The snapshot carries the
    /// configured (reset) positions, so rebuilding from it reproduces this
    /// machine's cipher from the top of the message.
    pub fn key(&self) -> Key {
        Key::new(
            [
                self.left_rotor.wheel(),
                self.middle_rotor.wheel(),
                self.right_rotor.wheel(),
            ],
            [
                self.left_rotor.ring(),
                self.middle_rotor.ring(),
                self.right_rotor.ring(),
            ],
            [
                self.left_rotor.initial_position(),
                self.middle_rotor.initial_position(),
                self.right_rotor.initial_position(),
            ],
            self.pairs.clone(),
        )
    }

    pub fn left_rotor(&self) -> &Rotor {
        &self.left_rotor
    }

    pub fn middle_rotor(&self) -> &Rotor {
        &self.middle_rotor
    }

    pub fn right_rotor(&self) -> &Rotor {
        &self.right_rotor
    }

    pub fn left_rotor_mut(&mut self) -> &mut Rotor {
        &mut self.left_rotor
    }

    pub fn middle_rotor_mut(&mut self) -> &mut Rotor {
        &mut self.middle_rotor
    }

    pub fn right_rotor_mut(&mut self) -> &mut Rotor {
        &mut self.right_rotor
    }

    pub fn reflector(&self) -> ReflectorId {
        self.reflector
    }

    pub fn plugboard(&self) -> &Plugboard {
        &self.plugboard
    }

    /// The installed pairs, in installation order.
    pub fn pairs(&self) -> &[(char, char)] {
        &self.pairs
    }

    /// Replace the whole plugboard. Rotor state is not disturbed.
    pub fn set_plugboard(&mut self, pairs: &[(char, char)]) {
        self.plugboard = Plugboard::new(pairs);
        self.pairs.clear();
        self.pairs.extend_from_slice(pairs);
    }

    /// Install one more cable, given as a two-letter string such as `"SX"`.
    /// A malformed pair, or a letter already carrying a cable, is a
    /// programmer error.
    pub fn add_pair(&mut self, pair: &str) {
        let mut chars = pair.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None) => self.add_plug((a, b)),
            _ => panic!("malformed plugboard pair: {pair:?}"),
        }
    }

    /// Install one more cable.
    pub fn add_plug(&mut self, pair: (char, char)) {
        self.pairs.push(pair);
        self.plugboard = Plugboard::new(&self.pairs);
    }

    /// Set all three positions, leftmost first. The reset targets follow.
    pub fn set_positions(&mut self, left: u8, middle: u8, right: u8) {
        self.left_rotor.set_position(left);
        self.middle_rotor.set_position(middle);
        self.right_rotor.set_position(right);
    }

    /// Return every rotor to its most recently set position.
    pub fn reset_positions(&mut self) {
        self.left_rotor.reset_position();
        self.middle_rotor.reset_position();
        self.right_rotor.reset_position();
    }

    /// Set all three ring settings, leftmost first. Positions are kept.
    pub fn set_rings(&mut self, left: u8, middle: u8, right: u8) {
        self.left_rotor.set_ring(left);
        self.middle_rotor.set_ring(middle);
        self.right_rotor.set_ring(right);
    }

    // Stepping happens before the letter is enciphered, and every turnover
    // check reads the positions as they stood at entry. The first clause is
    // the double-step anomaly: a middle rotor sitting on its own notch
    // drags the left rotor along and advances itself.
    fn step(&mut self) {
        if self.middle_rotor.at_turnover() {
            self.middle_rotor.turn();
            self.left_rotor.turn();
        } else if self.right_rotor.at_turnover() {
            self.middle_rotor.turn();
        }

        self.right_rotor.turn();
    }

    /// Encipher one upper-case letter, stepping the rotors first.
    pub fn encrypt(&mut self, c: char) -> char {
        debug_assert!(c.is_ascii_uppercase());
        let mut c = c as u8 - b'A';

        self.step();

        c = self.plugboard.swap(c);

        c = self.right_rotor.forward(c);
        c = self.middle_rotor.forward(c);
        c = self.left_rotor.forward(c);

        c = self.reflector.reflect(c);

        c = self.left_rotor.backward(c);
        c = self.middle_rotor.backward(c);
        c = self.right_rotor.backward(c);

        c = self.plugboard.swap(c);

        (c + b'A') as char
    }

    /// Encipher a string. Input is upper-cased and anything outside A-Z is
    /// silently dropped; the output is the contiguous cipher of the
    /// surviving letters. Running the same configuration over its own
    /// output (positions reset in between) restores the plaintext letters.
    pub fn encipher(&mut self, text: &str) -> String {
        letters(text).chars().map(|c| self.encrypt(c)).collect()
    }
}

impl Default for Enigma {
    fn default() -> Self {
        Self::new(
            [WheelId::I, WheelId::II, WheelId::III],
            [0, 0, 0],
            [0, 0, 0],
            ReflectorId::B,
            &[],
        )
    }
}
