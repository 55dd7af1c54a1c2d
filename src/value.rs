//! Dynamically typed values passed between converters, commands and scopes.
//!
//! A [`Value`] wraps any `Send + Sync` Rust value together with its
//! [`ValueType`] so the executor can check converter output against a
//! parameter's declared type and the resolver can use a scope instance's
//! concrete type as its scope identity.

use regex::Regex;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Identity of a concrete Rust type used as a parameter type or scope type.
#[derive(Clone, Copy)]
pub struct ValueType {
    id: TypeId,
    full_name: &'static str,
}

impl ValueType {
    /// Returns the value type of `T`.
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            full_name: std::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type name without its module path (e.g. `String`).
    pub fn name(&self) -> &'static str {
        short_type_name(self.full_name)
    }

    /// Returns the fully qualified type name.
    pub fn full_name(&self) -> &'static str {
        self.full_name
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueType({})", self.full_name)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strips the module path from a type name, keeping any generic arguments.
///
/// `alloc::string::String` becomes `String` and
/// `core::option::Option<i32>` becomes `Option<i32>`.
fn short_type_name(full: &'static str) -> &'static str {
    let head_end = full.find('<').unwrap_or(full.len());
    let start = full[..head_end].rfind("::").map(|pos| pos + 2).unwrap_or(0);
    &full[start..]
}

type Render = fn(&(dyn Any + Send + Sync)) -> String;

/// A shared, type-erased value.
///
/// Cloning a `Value` is cheap: the payload lives behind an `Arc`, so a scope
/// instance handed out by one command and captured by the next segment of a
/// path refers to the same object.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    ty: ValueType,
    render: Render,
}

impl Value {
    /// Wraps a value that is rendered with its `Display` implementation.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        Self {
            inner: Arc::new(value),
            ty: ValueType::of::<T>(),
            render: render_display::<T>,
        }
    }

    /// Wraps a value that is rendered with its `Debug` implementation.
    ///
    /// Intended for scope objects, which rarely have a user-facing `Display`.
    pub fn object<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug,
    {
        Self::shared(Arc::new(value))
    }

    /// Wraps an already shared object without cloning it.
    pub fn shared<T>(value: Arc<T>) -> Self
    where
        T: Any + Send + Sync + fmt::Debug,
    {
        Self {
            inner: value,
            ty: ValueType::of::<T>(),
            render: render_debug::<T>,
        }
    }

    /// Returns the concrete type of the wrapped value.
    pub fn value_type(&self) -> ValueType {
        self.ty
    }

    /// Returns true if the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.ty.id() == TypeId::of::<T>()
    }

    /// Borrows the wrapped value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns a shared handle to the wrapped value as a `T`.
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Renders the value for the console log.
    pub fn render(&self) -> String {
        (self.render)(self.inner.as_ref())
    }
}

fn render_display<T: Any + fmt::Display>(value: &(dyn Any + Send + Sync)) -> String {
    value
        .downcast_ref::<T>()
        .map(ToString::to_string)
        .unwrap_or_default()
}

fn render_debug<T: Any + fmt::Debug>(value: &(dyn Any + Send + Sync)) -> String {
    value
        .downcast_ref::<T>()
        .map(|v| format!("{v:?}"))
        .unwrap_or_default()
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({}: {})", self.ty.name(), self.render())
    }
}

/// Marker type of the root scope, which holds every global command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Root;

/// An RGBA color with 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn hex_color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#?([0-9A-Fa-f]{3,4}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$")
            .unwrap_or_else(|e| panic!("invalid color pattern: {e}"))
    })
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Creates an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with an explicit alpha channel.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses a hex color (`RGB`, `RGBA`, `RRGGBB` or `RRGGBBAA`, with or
    /// without a leading `#`) or one of a small set of named colors.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Some(color) = Self::named(input) {
            return Some(color);
        }
        Self::parse_hex(input)
    }

    /// Parses a hex color string only.
    pub fn parse_hex(input: &str) -> Option<Self> {
        let caps = hex_color_pattern().captures(input)?;
        let digits = caps.get(1)?.as_str();

        let nibble = |i: usize| u8::from_str_radix(&digits[i..=i], 16).ok().map(|n| n * 17);
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

        match digits.len() {
            3 => Some(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            4 => Some(Self::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "red" => Self::rgb(255, 0, 0),
            "cyan" | "aqua" => Self::rgb(0, 255, 255),
            "blue" => Self::rgb(0, 0, 255),
            "darkblue" => Self::rgb(0, 0, 160),
            "lightblue" => Self::rgb(173, 216, 230),
            "purple" => Self::rgb(128, 0, 128),
            "yellow" => Self::rgb(255, 255, 0),
            "lime" => Self::rgb(0, 255, 0),
            "fuchsia" | "magenta" => Self::rgb(255, 0, 255),
            "white" => Self::WHITE,
            "silver" => Self::rgb(192, 192, 192),
            "grey" | "gray" => Self::rgb(128, 128, 128),
            "black" => Self::BLACK,
            "orange" => Self::rgb(255, 165, 0),
            "brown" => Self::rgb(165, 42, 42),
            "maroon" => Self::rgb(128, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "olive" => Self::rgb(128, 128, 0),
            "navy" => Self::rgb(0, 0, 128),
            "teal" => Self::rgb(0, 128, 128),
            _ => return None,
        };
        Some(color)
    }

    /// Formats the color as `RRGGBB`, or `RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}
