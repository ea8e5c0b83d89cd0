//! The [`packable!`](crate::packable) struct definition macro.

/// Define a struct and derive its [`Pack`](crate::encoding::Pack) impl.
///
/// Fields use normal struct syntax. Prefixing a field with `ignore` keeps
/// it in the schema as a placeholder that contributes no bytes to the
/// payload; ignored fields are restored with `Default::default()` on
/// decode. The struct's identity key is the declaring module path plus the
/// type name, so structurally identical types declared in different
/// modules stay distinct.
///
/// ```
/// use schemapack_core::packable;
///
/// packable! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Session {
///         pub user: String,
///         pub hits: u64,
///         ignore cached_score: f64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! packable {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $crate::packable! { @accum
            attrs = { $(#[$meta])* }
            vis = { $vis }
            name = { $name }
            vars = { __builder __fields __node __spec __buf __reader __body __index __this }
            fields = {}
            schema = {}
            pack = {}
            unpack = {}
            rest = { $($body)* }
        }
    };

    // Ignored field: a schema placeholder, no payload bytes.
    (@accum
        attrs = { $($attrs:tt)* }
        vis = { $($vis:tt)* }
        name = { $name:ident }
        vars = { $b:ident $f:ident $n:ident $s:ident $w:ident $r:ident $y:ident $i:ident $t:ident }
        fields = { $($fields:tt)* }
        schema = { $($schema:tt)* }
        pack = { $($pack:tt)* }
        unpack = { $($unpack:tt)* }
        rest = { ignore $fvis:vis $fname:ident : $fty:ty $(, $($rest:tt)*)? }
    ) => {
        $crate::packable! { @accum
            attrs = { $($attrs)* }
            vis = { $($vis)* }
            name = { $name }
            vars = { $b $f $n $s $w $r $y $i $t }
            fields = { $($fields)* $fvis $fname: $fty, }
            schema = { $($schema)*
                $f.push($crate::types::FieldNode::ignored(stringify!($fname)));
            }
            pack = { $($pack)*
                $i += 1;
            }
            unpack = { $($unpack)*
                $fname: { $i += 1; ::core::default::Default::default() },
            }
            rest = { $($($rest)*)? }
        }
    };

    // Regular field.
    (@accum
        attrs = { $($attrs:tt)* }
        vis = { $($vis:tt)* }
        name = { $name:ident }
        vars = { $b:ident $f:ident $n:ident $s:ident $w:ident $r:ident $y:ident $i:ident $t:ident }
        fields = { $($fields:tt)* }
        schema = { $($schema:tt)* }
        pack = { $($pack:tt)* }
        unpack = { $($unpack:tt)* }
        rest = { $fvis:vis $fname:ident : $fty:ty $(, $($rest:tt)*)? }
    ) => {
        $crate::packable! { @accum
            attrs = { $($attrs)* }
            vis = { $($vis)* }
            name = { $name }
            vars = { $b $f $n $s $w $r $y $i $t }
            fields = { $($fields)* $fvis $fname: $fty, }
            schema = { $($schema)*
                $f.push(
                    <$fty as $crate::encoding::Pack>::schema($b).labeled(stringify!($fname)),
                );
            }
            pack = { $($pack)*
                {
                    let __child = $y.children.get($i).ok_or_else(|| {
                        $crate::error::PackError::Encoding(::std::format!(
                            "struct body too short at field {}",
                            stringify!($fname),
                        ))
                    })?;
                    $crate::encoding::Pack::pack(&$t.$fname, __child, $s, $w)?;
                    $i += 1;
                }
            }
            unpack = { $($unpack)*
                $fname: {
                    let __child = $y.children.get($i).ok_or_else(|| {
                        $crate::error::PackError::Encoding(::std::format!(
                            "struct body too short at field {}",
                            stringify!($fname),
                        ))
                    })?;
                    $i += 1;
                    $crate::encoding::Pack::unpack(__child, $s, $r)?
                },
            }
            rest = { $($($rest)*)? }
        }
    };

    // All fields consumed: emit the struct and its impl.
    (@accum
        attrs = { $($attrs:tt)* }
        vis = { $($vis:tt)* }
        name = { $name:ident }
        vars = { $b:ident $f:ident $n:ident $s:ident $w:ident $r:ident $y:ident $i:ident $t:ident }
        fields = { $($fields:tt)* }
        schema = { $($schema:tt)* }
        pack = { $($pack:tt)* }
        unpack = { $($unpack:tt)* }
        rest = { }
    ) => {
        $($attrs)*
        $($vis)* struct $name {
            $($fields)*
        }

        impl $crate::encoding::Pack for $name {
            fn schema($b: &mut $crate::types::SpecBuilder) -> $crate::types::FieldNode {
                $b.struct_node(
                    concat!(module_path!(), "::", stringify!($name)),
                    |$b| {
                        #[allow(unused_mut)]
                        let mut $f: ::std::vec::Vec<$crate::types::FieldNode> =
                            ::std::vec::Vec::new();
                        $($schema)*
                        let _ = $b;
                        $f
                    },
                )
            }

            fn pack(
                &self,
                $n: &$crate::types::FieldNode,
                $s: &$crate::types::TypeSpec,
                $w: &mut ::std::vec::Vec<u8>,
            ) -> ::core::result::Result<(), $crate::error::PackError> {
                let $y = $s.struct_body_for(
                    $n,
                    concat!(module_path!(), "::", stringify!($name)),
                )?;
                let $t = self;
                #[allow(unused_mut)]
                let mut $i = 0usize;
                $($pack)*
                let _ = ($y, $i, $w, $t);
                Ok(())
            }

            fn unpack(
                $n: &$crate::types::FieldNode,
                $s: &$crate::types::TypeSpec,
                $r: &mut $crate::encoding::Reader<'_>,
            ) -> ::core::result::Result<Self, $crate::error::PackError> {
                let $y = $s.struct_body_for(
                    $n,
                    concat!(module_path!(), "::", stringify!($name)),
                )?;
                #[allow(unused_mut)]
                let mut $i = 0usize;
                let __decoded = Self {
                    $($unpack)*
                };
                let _ = ($y, $i, $r);
                Ok(__decoded)
            }
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::fmt::Debug;

    use crate::encoding::{Pack, Reader};
    use crate::types::{FieldKind, TypeSpec};

    fn roundtrip<T: Pack + PartialEq + Debug>(value: &T) -> Vec<u8> {
        let spec = TypeSpec::of::<T>();
        let mut buf = Vec::new();
        value.pack(&spec.top, &spec, &mut buf).unwrap();
        let mut reader = Reader::new(&buf);
        let decoded = T::unpack(&spec.top, &spec, &mut reader).unwrap();
        assert_eq!(&decoded, value);
        assert!(reader.is_empty());
        buf
    }

    packable! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Simple {
            name: String,
            age: u32,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct Outer {
            embed: Simple,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct Many {
            embeds: Vec<Simple>,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct Referenced {
            embed: Option<Box<Simple>>,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct Recursive {
            name: String,
            rec: Option<Box<Recursive>>,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct WithMap {
            map: HashMap<String, String>,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct PartlyIgnored {
            kept: u16,
            ignore scratch: u64,
            also_kept: bool,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct FullyIgnored {
            ignore a: u64,
            ignore b: String,
        }
    }

    #[test]
    fn simple_struct_roundtrips() {
        roundtrip(&Simple {
            name: "Brendon".to_owned(),
            age: 31,
        });
    }

    #[test]
    fn embedded_struct_roundtrips() {
        roundtrip(&Outer {
            embed: Simple {
                name: "Brendon".to_owned(),
                age: 31,
            },
        });
    }

    #[test]
    fn struct_sequence_roundtrips() {
        roundtrip(&Many {
            embeds: vec![
                Simple { name: "Brendon".to_owned(), age: 31 },
                Simple { name: "Ben".to_owned(), age: 26 },
                Simple { name: "Nai".to_owned(), age: 32 },
            ],
        });
    }

    #[test]
    fn referenced_struct_roundtrips() {
        roundtrip(&Referenced {
            embed: Some(Box::new(Simple {
                name: "Brendon".to_owned(),
                age: 31,
            })),
        });

        let bytes = roundtrip(&Referenced { embed: None });
        assert_eq!(bytes, vec![0], "null pointer is a single zero byte");
    }

    #[test]
    fn recursive_struct_roundtrips() {
        roundtrip(&Recursive {
            name: "One".to_owned(),
            rec: Some(Box::new(Recursive {
                name: "Two".to_owned(),
                rec: Some(Box::new(Recursive {
                    name: "Three".to_owned(),
                    rec: None,
                })),
            })),
        });
    }

    #[test]
    fn map_field_roundtrips() {
        let mut map = HashMap::new();
        map.insert("One".to_owned(), "Two".to_owned());
        map.insert("Three".to_owned(), "Four".to_owned());
        roundtrip(&WithMap { map });
    }

    #[test]
    fn empty_map_field_roundtrips() {
        let bytes = roundtrip(&WithMap { map: HashMap::new() });
        assert_eq!(bytes, vec![0]);
    }

    #[test]
    fn ignored_fields_write_nothing_and_decode_to_default() {
        let spec = TypeSpec::of::<PartlyIgnored>();
        let body = spec.struct_body(&spec.top.struct_name).unwrap();
        assert_eq!(body.children.len(), 3);
        assert_eq!(body.children[1].kind, FieldKind::Ignored);
        assert_eq!(body.children[1].label, "scratch");

        let value = PartlyIgnored {
            kept: 7,
            scratch: 999,
            also_kept: true,
        };
        let mut buf = Vec::new();
        value.pack(&spec.top, &spec, &mut buf).unwrap();
        assert_eq!(buf, vec![0, 7, 1], "u16 then bool, nothing between");

        let mut reader = Reader::new(&buf);
        let decoded = PartlyIgnored::unpack(&spec.top, &spec, &mut reader).unwrap();
        assert_eq!(decoded.kept, 7);
        assert_eq!(decoded.scratch, 0, "ignored fields come back as default");
        assert!(decoded.also_kept);
    }

    #[test]
    fn fully_ignored_struct_encodes_to_zero_bytes() {
        let spec = TypeSpec::of::<FullyIgnored>();
        let value = FullyIgnored {
            a: 1,
            b: "x".to_owned(),
        };
        let mut buf = Vec::new();
        value.pack(&spec.top, &spec, &mut buf).unwrap();
        assert!(buf.is_empty());

        let mut reader = Reader::new(&buf);
        let decoded = FullyIgnored::unpack(&spec.top, &spec, &mut reader).unwrap();
        assert_eq!(decoded, FullyIgnored::default());
    }
}
