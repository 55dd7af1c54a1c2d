//! Parameter converters.
//!
//! A converter turns one raw token typed by the user into a [`Value`] of a
//! single semantic type, or reports that the token cannot be parsed. Each
//! type has at most one converter; the [`ConverterRegistry`] enforces this.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::DefinitionError;
use crate::value::{Color, Value, ValueType};

/// Converts a raw token into a typed value.
pub trait Converter: Send + Sync {
    /// The type of every value this converter produces.
    fn output_type(&self) -> ValueType;

    /// Converts `token`, returning `None` if it is not a valid value.
    fn convert(&self, token: &str) -> Option<Value>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A converter backed by a parsing function.
pub struct FnConverter<T, F> {
    parse: F,
    name: &'static str,
    _output: PhantomData<fn() -> T>,
}

impl<T, F> FnConverter<T, F>
where
    T: Any + Send + Sync + fmt::Display,
    F: Fn(&str) -> Option<T> + Send + Sync,
{
    pub fn new(name: &'static str, parse: F) -> Self {
        Self {
            parse,
            name,
            _output: PhantomData,
        }
    }
}

impl<T, F> Converter for FnConverter<T, F>
where
    T: Any + Send + Sync + fmt::Display,
    F: Fn(&str) -> Option<T> + Send + Sync,
{
    fn output_type(&self) -> ValueType {
        ValueType::of::<T>()
    }

    fn convert(&self, token: &str) -> Option<Value> {
        (self.parse)(token).map(Value::new)
    }

    fn name(&self) -> &str {
        self.name
    }
}

type ConverterFactory = Box<dyn Fn() -> Option<Arc<dyn Converter>> + Send + Sync>;

/// A converter waiting to be registered for a semantic type.
pub struct ConverterDecl {
    target: ValueType,
    name: String,
    factory: ConverterFactory,
}

impl ConverterDecl {
    /// Declares a converter that is constructed with `Default`.
    pub fn of<C>(target: ValueType) -> Self
    where
        C: Converter + Default + 'static,
    {
        Self {
            target,
            name: std::any::type_name::<C>().to_string(),
            factory: Box::new(|| Some(Arc::new(C::default()) as Arc<dyn Converter>)),
        }
    }

    /// Declares a converter for `T` from a parsing function.
    pub fn from_fn<T, F>(name: &'static str, parse: F) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
        F: Fn(&str) -> Option<T> + Send + Sync + Clone + 'static,
    {
        Self {
            target: ValueType::of::<T>(),
            name: name.to_string(),
            factory: Box::new(move || {
                Some(Arc::new(FnConverter::new(name, parse.clone())) as Arc<dyn Converter>)
            }),
        }
    }

    /// Declares a converter built by `factory`. A factory returning `None`
    /// marks a converter that cannot be built without configuration.
    pub fn with_factory<F>(target: ValueType, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Option<Arc<dyn Converter>> + Send + Sync + 'static,
    {
        Self {
            target,
            name: name.into(),
            factory: Box::new(factory),
        }
    }

    pub fn target(&self) -> ValueType {
        self.target
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ConverterDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterDecl")
            .field("target", &self.target)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Maps each semantic type to its single converter.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<ValueType, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates and registers a converter.
    ///
    /// Fails if the type already has a converter, if the factory cannot
    /// produce an instance, or if the instance produces a different type.
    pub fn register(&mut self, decl: ConverterDecl) -> Result<(), DefinitionError> {
        if let Some(existing) = self.converters.get(&decl.target) {
            return Err(DefinitionError::CompetingConverters {
                ty: decl.target.name().to_string(),
                existing: existing.name().to_string(),
                competing: decl.name,
            });
        }

        let converter = panic::catch_unwind(AssertUnwindSafe(|| (decl.factory)()))
            .ok()
            .flatten()
            .ok_or_else(|| DefinitionError::ConverterNotConstructible(decl.name.clone()))?;

        if converter.output_type() != decl.target {
            return Err(DefinitionError::ConverterContract {
                converter: decl.name,
                declared: converter.output_type().name().to_string(),
                expected: decl.target.name().to_string(),
            });
        }

        self.converters.insert(decl.target, converter);
        Ok(())
    }

    pub fn lookup(&self, ty: ValueType) -> Option<Arc<dyn Converter>> {
        self.converters.get(&ty).cloned()
    }

    pub fn contains(&self, ty: ValueType) -> bool {
        self.converters.contains_key(&ty)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

/// Parses a boolean, accepting yes/no/y/n/t/f/true/false in any case.
pub fn parse_bool(token: &str) -> Option<bool> {
    match token.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Parses a token consisting of exactly one character.
pub fn parse_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(token: &str) -> Option<T> {
    token.trim().parse().ok()
}

/// Converters for the primitive types every console understands.
pub fn builtin_converters() -> Vec<ConverterDecl> {
    vec![
        ConverterDecl::from_fn("BoolConverter", parse_bool),
        ConverterDecl::from_fn("CharConverter", parse_char),
        ConverterDecl::from_fn("StringConverter", |token: &str| Some(token.to_string())),
        ConverterDecl::from_fn("ColorConverter", Color::parse),
        ConverterDecl::from_fn("I8Converter", parse_number::<i8>),
        ConverterDecl::from_fn("I16Converter", parse_number::<i16>),
        ConverterDecl::from_fn("I32Converter", parse_number::<i32>),
        ConverterDecl::from_fn("I64Converter", parse_number::<i64>),
        ConverterDecl::from_fn("I128Converter", parse_number::<i128>),
        ConverterDecl::from_fn("U8Converter", parse_number::<u8>),
        ConverterDecl::from_fn("U16Converter", parse_number::<u16>),
        ConverterDecl::from_fn("U32Converter", parse_number::<u32>),
        ConverterDecl::from_fn("U64Converter", parse_number::<u64>),
        ConverterDecl::from_fn("U128Converter", parse_number::<u128>),
        ConverterDecl::from_fn("F32Converter", parse_number::<f32>),
        ConverterDecl::from_fn("F64Converter", parse_number::<f64>),
    ]
}
