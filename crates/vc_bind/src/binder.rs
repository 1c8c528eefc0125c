use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;

use serde_core::de::{DeserializeSeed, Deserializer};
use serde_core::ser::{Serialize, Serializer};

use crate::read::{ReadContext, ReadSeed, ReaderCache, ValueReader};
use crate::write::{ValueProxy, ValueWriter, WriteContext, WriterCache};
use crate::{Bind, BindConfig, BindError, Bindable, BoxedValue, Features, NullState, Result, TypeKey, codec};

/// Entry point tying the configuration and both caches together.
///
/// A binder is cheap to share between threads; all methods take `&self`.
/// [`new`](Self::new) and [`with_config`](Self::with_config) install the
/// default [codecs](crate::codec).
///
/// ```
/// use vc_bind::{Bind, Binder, BindConfig, Features};
///
/// #[derive(Bind, Default)]
/// #[bind(default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let binder = Binder::with_config(BindConfig::default().with_feature(Features::PRETTY_PRINT, true));
/// let text = binder.write_val(&Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(text, "{\n  \"x\": 1,\n  \"y\": 2\n}");
/// ```
#[derive(Debug)]
pub struct Binder {
    config: BindConfig,
    readers: ReaderCache,
    writers: WriterCache,
}

impl Binder {
    #[inline]
    pub fn new() -> Self {
        Self::with_config(BindConfig::default())
    }

    pub fn with_config(config: BindConfig) -> Self {
        let binder = Self {
            readers: ReaderCache::new(config.reader_cache_capacity),
            writers: WriterCache::new(config.writer_cache_capacity),
            config,
        };
        codec::install_defaults(&binder);
        binder
    }

    #[inline]
    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    #[inline]
    pub fn readers(&self) -> &ReaderCache {
        &self.readers
    }

    #[inline]
    pub fn writers(&self) -> &WriterCache {
        &self.writers
    }

    /// Writes values of type `T` with `writer`, replacing earlier ones.
    pub fn register_serializer<T: Bind>(&self, writer: impl ValueWriter) {
        self.writers.register(TypeKey::of::<T>(), Arc::new(writer));
    }

    /// Reads values of type `T` with `reader`, replacing earlier ones.
    pub fn register_deserializer<T: Bind>(&self, reader: impl ValueReader) {
        self.readers.register(TypeKey::of::<T>(), Arc::new(reader));
    }

    // -------------------------------------------------------------------------
    // Writing

    /// Writes `value` as a JSON document.
    ///
    /// A value that is not present (`None`, an unset tri-state) yields an
    /// empty string. The output is indented with
    /// [`PRETTY_PRINT`](Features::PRETTY_PRINT).
    pub fn write_val(&self, value: &dyn Bindable) -> Result<String> {
        self.write_json(value, self.config.has(Features::PRETTY_PRINT))
    }

    pub(crate) fn write_json(&self, value: &dyn Bindable, pretty: bool) -> Result<String> {
        if value.presence() != NullState::Present {
            return Ok(String::new());
        }
        let ctx = WriteContext::new(&self.writers, &self.config);
        let proxy = ValueProxy::new(value, &ctx);
        let written = match pretty {
            true => serde_json::to_string_pretty(&proxy),
            false => serde_json::to_string(&proxy),
        };
        written.map_err(|err| ctx.take_failure().unwrap_or(BindError::Json(err)))
    }

    /// Writes `value` into any serde serializer.
    pub fn write_to<S: Serializer>(&self, value: &dyn Bindable, serializer: S) -> Result<S::Ok> {
        let ctx = WriteContext::new(&self.writers, &self.config);
        ValueProxy::new(value, &ctx)
            .serialize(serializer)
            .map_err(|err| ctx.take_failure().unwrap_or_else(|| BindError::Custom(err.to_string())))
    }

    /// Runs `func` with a serializable view of `value`, for format
    /// functions that want a `&impl Serialize`.
    ///
    /// ```
    /// use vc_bind::Binder;
    ///
    /// let binder = Binder::new();
    /// let text = binder.write_with(&vec![1u16, 2], |view| ron::to_string(view)).unwrap();
    /// assert_eq!(text, "[1,2]");
    /// ```
    pub fn write_with<R>(&self, value: &dyn Bindable, func: impl FnOnce(&ValueProxy<'_, '_>) -> R) -> R {
        let ctx = WriteContext::new(&self.writers, &self.config);
        func(&ValueProxy::new(value, &ctx))
    }

    // -------------------------------------------------------------------------
    // Reading

    /// Reads a `T` from a JSON document.
    ///
    /// `Ok(None)` is returned for a `null` document, and for an empty one
    /// when the reader of `T` accepts empty input. Other empty input fails
    /// with [`BindError::NoContent`].
    pub fn read_val<T: Bind>(&self, text: &str) -> Result<Option<T>> {
        let reader = self.readers.reader_for(TypeKey::of::<T>())?;
        if text.trim().is_empty() {
            return match reader.accepts_empty() {
                true => Ok(None),
                false => Err(BindError::NoContent),
            };
        }

        let ctx = ReadContext::new(&self.readers, &self.config);
        let mut de = serde_json::Deserializer::from_str(text);
        let read = ReadSeed {
            reader: &*reader,
            ctx: &ctx,
        }
        .deserialize(&mut de)
        .and_then(|value| de.end().map(|()| value));

        let value = read.map_err(|err| ctx.take_failure().unwrap_or(BindError::Json(err)))?;
        value.map(unbox_read::<T>).transpose()
    }

    /// Reads a `T` from any serde deserializer.
    pub fn read_from<'de, T: Bind, D: Deserializer<'de>>(&self, deserializer: D) -> Result<Option<T>> {
        let reader = self.readers.reader_for(TypeKey::of::<T>())?;
        let ctx = ReadContext::new(&self.readers, &self.config);
        let value = ReadSeed {
            reader: &*reader,
            ctx: &ctx,
        }
        .deserialize(deserializer)
        .map_err(|err| ctx.take_failure().unwrap_or_else(|| BindError::Custom(err.to_string())))?;
        value.map(unbox_read::<T>).transpose()
    }
}

impl Default for Binder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

fn unbox_read<T: Bind>(value: BoxedValue) -> Result<T> {
    value
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| BindError::Internal(format!("reader for `{}` produced another type", T::type_name())))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use indexmap::IndexMap;

    use super::Binder;
    use crate::info::{BeanInfo, PropInfo, Shape};
    use crate::{Bind, BindConfig, BindError, DynamicValue, Features};

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Known {
        #[bind(rename = "knownField")]
        known_field: i32,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Pet {
        name: String,
        age: Option<u32>,
        tags: Vec<String>,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Flat {
        id: u32,
        #[bind(rename = "prop.a", flatten)]
        a: Option<i32>,
        #[bind(rename = "prop.b", flatten)]
        b: Option<String>,
        #[bind(rename = "prop.deep.c", flatten)]
        c: bool,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Tree {
        value: i32,
        children: Vec<Tree>,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Department {
        name: String,
        manager: Option<Box<Employee>>,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Employee {
        name: String,
        department: Option<Box<Department>>,
    }

    #[derive(Bind, Clone, Copy, Default, Debug, PartialEq)]
    enum Color {
        #[default]
        Red,
        #[bind(rename = "GREEN")]
        Green,
        Blue,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Paint {
        color: Color,
        palette: Vec<Color>,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Bag {
        name: String,
        #[bind(unwrapped)]
        extra: IndexMap<String, DynamicValue>,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Extra {
        name: String,
        #[bind(unwrapped)]
        extra: BTreeMap<String, Option<i32>>,
    }

    #[derive(Bind, Debug, PartialEq)]
    struct Id(String);

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default, from_str)]
    struct Version {
        major: u32,
        minor: u32,
    }

    impl FromStr for Version {
        type Err = String;

        fn from_str(text: &str) -> Result<Self, String> {
            let (major, minor) = text.split_once('.').ok_or("missing dot")?;
            Ok(Self {
                major: major.parse().map_err(|_| "bad major")?,
                minor: minor.parse().map_err(|_| "bad minor")?,
            })
        }
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default, discriminator = "kind", discriminator_value = "animal")]
    struct Animal {
        name: String,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default, discriminator = "kind", discriminator_value = "dog")]
    struct Dog {
        #[bind(base)]
        animal: Animal,
        good: bool,
    }

    #[derive(Bind, Default, Debug, PartialEq)]
    #[bind(default)]
    struct Account {
        #[bind(get = "owner", set = "set_owner")]
        owner: String,
        #[bind(read_only)]
        balance: i64,
    }

    impl Account {
        fn owner(&self) -> &String {
            &self.owner
        }

        fn set_owner(&mut self, owner: String) {
            self.owner = owner.to_lowercase();
        }
    }

    #[derive(Default, Debug)]
    struct Strict {
        age: u32,
    }

    impl Bind for Strict {
        fn shape() -> Shape {
            Shape::Bean(
                BeanInfo::new::<Self>()
                    .with_default_ctor(crate::info::construct_default::<Self>)
                    .with_prop(
                        PropInfo::new::<u32>("age")
                            .with_getter(crate::info::AccessorKind::Field, |this| {
                                this.downcast_ref::<Strict>().map(|this| &this.age as &dyn crate::Bindable)
                            })
                            .with_setter(|_, _| Err(BindError::Custom("age is frozen".into()))),
                    ),
            )
        }
    }

    #[test]
    fn known_fields_are_read_and_unknown_ones_skipped() {
        let binder = Binder::new();
        let text = r#"{"knownField":1,"unknownField":{"nested":[true,{"deeper":null}]}}"#;
        let read: Known = binder.read_val(text).unwrap().unwrap();
        assert_eq!(read, Known { known_field: 1 });
    }

    #[test]
    fn unknown_fields_can_be_made_fatal() {
        let binder = Binder::with_config(
            BindConfig::default().with_feature(Features::FAIL_ON_UNKNOWN_PROPERTIES, true),
        );
        let err = binder.read_val::<Known>(r#"{"knownField":1,"other":2}"#).unwrap_err();
        assert!(
            matches!(&err, BindError::UnknownProperty { name, .. } if name == "other"),
            "{err}"
        );
    }

    #[test]
    fn null_properties_are_omitted() {
        let binder = Binder::new();
        let pet = Pet {
            name: "Rex".into(),
            age: None,
            tags: vec!["a".into()],
        };
        let text = binder.write_val(&pet).unwrap();
        assert_eq!(text, r#"{"name":"Rex","tags":["a"]}"#);
        assert_eq!(binder.read_val::<Pet>(&text).unwrap().unwrap(), pet);

        let read: Pet = binder.read_val(r#"{"name":"Tom","age":null}"#).unwrap().unwrap();
        assert_eq!(read.age, None);
    }

    #[test]
    fn flattened_properties_round_trip() {
        let binder = Binder::new();
        let flat = Flat {
            id: 7,
            a: Some(1),
            b: Some("x".into()),
            c: true,
        };
        let text = binder.write_val(&flat).unwrap();
        assert_eq!(text, r#"{"id":7,"prop":{"a":1,"b":"x","deep":{"c":true}}}"#);
        assert_eq!(binder.read_val::<Flat>(&text).unwrap().unwrap(), flat);

        let sparse = Flat {
            id: 1,
            ..Flat::default()
        };
        assert_eq!(
            binder.write_val(&sparse).unwrap(),
            r#"{"id":1,"prop":{"deep":{"c":false}}}"#
        );
    }

    #[test]
    fn self_referential_beans() {
        let binder = Binder::new();
        let text = r#"{"value":1,"children":[{"value":2,"children":[]},{"value":3,"children":[{"value":4}]}]}"#;
        let tree: Tree = binder.read_val(text).unwrap().unwrap();
        assert_eq!(tree.children[1].children[0].value, 4);
        assert_eq!(binder.read_val::<Tree>(&binder.write_val(&tree).unwrap()).unwrap().unwrap(), tree);
    }

    #[test]
    fn mutually_recursive_beans() {
        let binder = Binder::new();
        let text = r#"{"name":"R&D","manager":{"name":"Ada","department":{"name":"Board"}}}"#;
        let dept: Department = binder.read_val(text).unwrap().unwrap();
        let manager = dept.manager.as_ref().unwrap();
        assert_eq!(manager.department.as_ref().unwrap().name, "Board");
        assert_eq!(binder.write_val(&dept).unwrap(), text);
    }

    #[test]
    fn concurrent_first_use() {
        let binder = Binder::new();
        let text = r#"{"name":"A","manager":{"name":"B"}}"#;
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let dept: Department = binder.read_val(text).unwrap().unwrap();
                    assert_eq!(dept.manager.unwrap().name, "B");
                    assert!(binder.write_val(&Tree::default()).is_ok());
                });
            }
        });
    }

    #[test]
    fn enums_read_names_and_ordinals() {
        let binder = Binder::new();
        let read: Paint = binder
            .read_val(r#"{"color":"GREEN","palette":[1,"Blue",0]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(read.color, Color::Green);
        assert_eq!(read.palette, [Color::Green, Color::Blue, Color::Red]);
        assert_eq!(
            binder.write_val(&read).unwrap(),
            r#"{"color":"GREEN","palette":["GREEN","Blue","Red"]}"#
        );

        let by_index = Binder::with_config(
            BindConfig::default().with_feature(Features::WRITE_ENUMS_USING_INDEX, true),
        );
        assert_eq!(by_index.write_val(&Color::Blue).unwrap(), "2");
        assert!(binder.read_val::<Color>("\"Purple\"").is_err());
    }

    #[test]
    fn unwrapped_maps_collect_unknown_fields() {
        let binder = Binder::new();
        let text = r#"{"name":"box","width":3,"tags":["x"],"name2":null}"#;
        let bag: Bag = binder.read_val(text).unwrap().unwrap();
        assert_eq!(bag.name, "box");
        assert_eq!(bag.extra.get("width"), Some(&DynamicValue::Int(3)));
        assert_eq!(bag.extra.get("name2"), Some(&DynamicValue::Null));
        assert_eq!(binder.write_val(&bag).unwrap(), text);
    }

    #[test]
    fn unwrapped_null_entries_are_skipped() {
        let binder = Binder::new();
        let mut extra = Extra {
            name: "n".into(),
            ..Default::default()
        };
        extra.extra.insert("x".into(), Some(1));
        extra.extra.insert("y".into(), None);
        assert_eq!(binder.write_val(&extra).unwrap(), r#"{"name":"n","x":1}"#);

        let read: Extra = binder.read_val(r#"{"name":"n","x":1,"y":null}"#).unwrap().unwrap();
        assert_eq!(read.extra.get("x"), Some(&Some(1)));
    }

    #[test]
    fn value_types_and_string_constructors() {
        let binder = Binder::new();
        assert_eq!(binder.write_val(&Id("abc".into())).unwrap(), "\"abc\"");
        assert_eq!(binder.read_val::<Id>("\"abc\"").unwrap().unwrap(), Id("abc".into()));

        let from_text: Version = binder.read_val("\"1.2\"").unwrap().unwrap();
        let from_object: Version = binder.read_val(r#"{"major":1,"minor":2}"#).unwrap().unwrap();
        assert_eq!(from_text, from_object);
        let err = binder.read_val::<Version>("\"1\"").unwrap_err();
        assert!(matches!(err, BindError::Construct { .. }), "{err}");
    }

    #[test]
    fn discriminator_is_written_first_and_ignored_on_read() {
        let binder = Binder::new();
        let dog = Dog {
            animal: Animal { name: "Rex".into() },
            good: true,
        };
        let text = binder.write_val(&dog).unwrap();
        assert_eq!(text, r#"{"kind":"dog","name":"Rex","good":true}"#);
        assert_eq!(binder.read_val::<Dog>(&text).unwrap().unwrap(), dog);
    }

    #[test]
    fn accessor_methods_and_read_only_properties() {
        let binder = Binder::with_config(
            BindConfig::default().with_feature(Features::FAIL_ON_UNKNOWN_PROPERTIES, true),
        );
        let account: Account = binder
            .read_val(r#"{"owner":"ADA","balance":100}"#)
            .unwrap()
            .unwrap();
        assert_eq!(account.owner, "ada");
        assert_eq!(account.balance, 0);
        assert_eq!(binder.write_val(&account).unwrap(), r#"{"owner":"ada","balance":0}"#);
    }

    #[test]
    fn setter_failures_name_the_property() {
        let binder = Binder::new();
        let err = binder.read_val::<Strict>(r#"{"age":3}"#).unwrap_err();
        assert!(
            matches!(&err, BindError::Assign { property: "age", .. }),
            "{err}"
        );
        assert!(binder.write_val(&Strict { age: 3 }).unwrap().contains("3"));
    }

    #[test]
    fn empty_and_null_documents() {
        let binder = Binder::new();
        assert!(matches!(binder.read_val::<Known>("  "), Err(BindError::NoContent)));
        assert_eq!(binder.read_val::<Known>("null").unwrap(), None);
        assert_eq!(binder.write_val(&None::<Known>).unwrap(), "");
    }

    #[test]
    fn structural_mismatch_is_an_error() {
        let binder = Binder::new();
        assert!(binder.read_val::<Known>("[1,2]").is_err());
        assert!(binder.read_val::<Vec<i32>>("{}").is_err());
        let err = binder.read_val::<Known>(r#"{"knownField":"many"}"#).unwrap_err();
        assert!(matches!(err, BindError::Mismatch { ty: "i32", .. }), "{err}");
    }

    #[test]
    fn maps_and_sequences_keep_null_wrappers() {
        let binder = Binder::new();
        let mut map = BTreeMap::new();
        map.insert(String::from("a"), Some(1));
        map.insert(String::from("b"), None);
        assert_eq!(binder.write_val(&map).unwrap(), r#"{"a":1,"b":null}"#);
        let read: BTreeMap<String, Option<i32>> = binder.read_val(r#"{"a":1,"b":null}"#).unwrap().unwrap();
        assert_eq!(read, map);

        let list: Vec<Option<i32>> = binder.read_val("[1,null,3]").unwrap().unwrap();
        assert_eq!(list, [Some(1), None, Some(3)]);
        let dropped: Vec<i64> = binder.read_val("[1,null,3]").unwrap().unwrap();
        assert_eq!(dropped, [1, 3]);
    }

    #[test]
    fn other_formats_through_serde() {
        let binder = Binder::new();
        let pet = Pet {
            name: "Rex".into(),
            age: Some(3),
            tags: vec![],
        };
        let text = binder.write_with(&pet, |view| ron::to_string(view)).unwrap();
        let mut de = ron::Deserializer::from_str(&text).unwrap();
        let read: Pet = binder.read_from(&mut de).unwrap().unwrap();
        assert_eq!(read, pet);
    }

    #[test]
    fn tiny_caches_still_work() {
        let binder = Binder::with_config(
            BindConfig::default()
                .with_reader_cache_capacity(1)
                .with_writer_cache_capacity(1),
        );
        let text = r#"{"name":"R&D","manager":{"name":"Ada","department":{"name":"Board"}}}"#;
        let dept: Department = binder.read_val(text).unwrap().unwrap();
        assert_eq!(binder.write_val(&dept).unwrap(), text);
        assert!(binder.readers().len() <= 1);
    }
}
