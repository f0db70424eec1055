//! Type shapes: primitives, structs, arrays, references, slices, permissions

use bitflags::bitflags;

use super::{DeclId, NameUse, Program, Symbol, TypeId};
use crate::common::Span;

bitflags! {
    /// Capabilities a permission grants to the holder of a reference
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PermFlags: u8 {
        const MAY_READ = 1 << 0;
        const MAY_WRITE = 1 << 1;
        /// Other references to the same object may exist
        const MAY_ALIAS = 1 << 2;
        /// Safe to share across threads
        const RACE_SAFE = 1 << 3;
    }
}

impl PermFlags {
    /// The only path to the object: it may be lent under any other permission
    pub fn is_unique(self) -> bool {
        self.contains(PermFlags::MAY_WRITE | PermFlags::RACE_SAFE)
            && !self.contains(PermFlags::MAY_ALIAS)
    }
}

/// Builtin scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
}

impl PrimType {
    pub const ALL: [PrimType; 12] = [
        PrimType::Bool,
        PrimType::I8,
        PrimType::I16,
        PrimType::I32,
        PrimType::I64,
        PrimType::U8,
        PrimType::U16,
        PrimType::U32,
        PrimType::U64,
        PrimType::Usize,
        PrimType::F32,
        PrimType::F64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimType::Bool => "bool",
            PrimType::I8 => "i8",
            PrimType::I16 => "i16",
            PrimType::I32 => "i32",
            PrimType::I64 => "i64",
            PrimType::U8 => "u8",
            PrimType::U16 => "u16",
            PrimType::U32 => "u32",
            PrimType::U64 => "u64",
            PrimType::Usize => "usize",
            PrimType::F32 => "f32",
            PrimType::F64 => "f64",
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            PrimType::Bool | PrimType::I8 | PrimType::U8 => 8,
            PrimType::I16 | PrimType::U16 => 16,
            PrimType::I32 | PrimType::U32 | PrimType::F32 => 32,
            PrimType::I64 | PrimType::U64 | PrimType::Usize | PrimType::F64 => 64,
        }
    }

    pub fn is_int(self) -> bool {
        !matches!(self, PrimType::Bool | PrimType::F32 | PrimType::F64)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, PrimType::I8 | PrimType::I16 | PrimType::I32 | PrimType::I64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimType::F32 | PrimType::F64)
    }

    pub fn is_numeric(self) -> bool {
        self != PrimType::Bool
    }
}

/// A nominal struct; `base` makes it a subtype of another struct
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: Symbol,
    pub base: Option<TypeId>,
    pub fields: Vec<(Symbol, TypeId)>,
}

/// Function signature; parameters are variable declarations
#[derive(Debug, Clone, PartialEq)]
pub struct FnSig {
    pub params: Vec<DeclId>,
    pub ret: TypeId,
}

/// Reference (or, with `slice`, array-reference) type
#[derive(Debug, Clone, PartialEq)]
pub struct RefType {
    /// Region the referent lives in; the void type accepts any region
    pub region: TypeId,
    pub perm: TypeId,
    pub pointee: TypeId,
    pub nullable: bool,
    pub slice: bool,
    /// Runtime layout `(*pointee, usize)`, present exactly when `slice` is set
    pub fat_ptr: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// No value; also the wildcard region
    Void,
    /// Placeholder for a `let` whose type comes from its initializer
    Infer,
    /// Name of a declared type, permission or region
    Name(NameUse),
    Prim(PrimType),
    Struct(StructType),
    Array { elem: TypeId, len: u64 },
    Ref(RefType),
    /// Raw pointer
    Ptr { pointee: TypeId },
    Tuple(Vec<TypeId>),
    FnSig(FnSig),
    Perm(PermFlags),
    Region(Symbol),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub span: Span,
}

impl Program {
    /// Follow resolved type names to the type they declare
    pub fn type_decl(&self, mut ty: TypeId) -> TypeId {
        while let TypeKind::Name(NameUse { decl: Some(decl), .. }) = &self.ty(ty).kind {
            let decl = self.decl(*decl);
            if !decl.kind.declares_type() || decl.vtype == ty {
                break;
            }
            ty = decl.vtype;
        }
        ty
    }

    /// Kind of the type a (possibly named) type denotes
    pub fn kind_of(&self, ty: TypeId) -> &TypeKind {
        &self.ty(self.type_decl(ty)).kind
    }

    pub fn ref_type(&self, ty: TypeId) -> Option<&RefType> {
        match self.kind_of(ty) {
            TypeKind::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn prim_type(&self, ty: TypeId) -> Option<PrimType> {
        match self.kind_of(ty) {
            TypeKind::Prim(p) => Some(*p),
            _ => None,
        }
    }

    /// Capabilities of a permission type; empty when `perm` is not a permission
    pub fn perm_flags(&self, perm: TypeId) -> PermFlags {
        match self.kind_of(perm) {
            TypeKind::Perm(flags) => *flags,
            _ => PermFlags::empty(),
        }
    }

    pub fn is_void(&self, ty: TypeId) -> bool {
        matches!(self.kind_of(ty), TypeKind::Void)
    }

    /// Unresolved name or not yet inferred: comparisons against it are skipped
    pub fn is_unknown(&self, ty: TypeId) -> bool {
        matches!(self.kind_of(ty), TypeKind::Infer | TypeKind::Name(_))
    }

    pub fn new_ref(&mut self, region: TypeId, perm: TypeId, pointee: TypeId, span: Span) -> TypeId {
        self.add_type(
            TypeKind::Ref(RefType {
                region,
                perm,
                pointee,
                nullable: false,
                slice: false,
                fat_ptr: None,
            }),
            span,
        )
    }

    /// Turn a reference into a slice and synthesize its fat pointer tuple
    pub fn mark_slice(&mut self, reference: TypeId) {
        let (pointee, span) = match &self.ty(reference).kind {
            TypeKind::Ref(r) => (r.pointee, self.ty(reference).span),
            _ => return,
        };

        let ptr = self.add_type(TypeKind::Ptr { pointee }, span);
        let usize_decl = self.builtins().usize_decl();
        let usize_name = self.decl(usize_decl).name;
        let size = self.add_type(TypeKind::Name(NameUse::resolved(usize_name, usize_decl)), span);
        let fat_ptr = self.add_type(TypeKind::Tuple(vec![ptr, size]), span);

        if let TypeKind::Ref(r) = &mut self.ty_mut(reference).kind {
            r.slice = true;
            r.fat_ptr = Some(fat_ptr);
        }
    }

    /// Drop the slice flag together with the derived tuple
    pub fn clear_slice(&mut self, reference: TypeId) {
        if let TypeKind::Ref(r) = &mut self.ty_mut(reference).kind {
            r.slice = false;
            r.fat_ptr = None;
        }
    }

    /// Change what a reference points to, keeping a slice's tuple consistent
    pub fn set_pointee(&mut self, reference: TypeId, pointee: TypeId) {
        let slice = match &mut self.ty_mut(reference).kind {
            TypeKind::Ref(r) => {
                r.pointee = pointee;
                r.slice
            }
            _ => return,
        };
        if slice {
            self.mark_slice(reference);
        }
    }

    /// Human-readable rendering for diagnostics
    pub fn display_type(&self, ty: TypeId) -> String {
        match &self.ty(ty).kind {
            TypeKind::Void => "void".to_string(),
            TypeKind::Infer => "_".to_string(),
            TypeKind::Name(name) => self.name(name.name).to_string(),
            TypeKind::Prim(p) => p.name().to_string(),
            TypeKind::Struct(s) => self.name(s.name).to_string(),
            TypeKind::Array { elem, len } => format!("[{}]{}", len, self.display_type(*elem)),
            TypeKind::Ref(r) => {
                let mut out = String::from("&");
                if r.nullable {
                    out.push('?');
                }
                if !self.is_void(r.region) {
                    out.push_str(&self.display_type(r.region));
                    out.push(' ');
                }
                out.push_str(&self.display_type(r.perm));
                out.push(' ');
                if r.slice {
                    out.push_str("[]");
                }
                out.push_str(&self.display_type(r.pointee));
                out
            }
            TypeKind::Ptr { pointee } => format!("*{}", self.display_type(*pointee)),
            TypeKind::Tuple(types) => {
                let parts: Vec<_> = types.iter().map(|t| self.display_type(*t)).collect();
                format!("({})", parts.join(", "))
            }
            TypeKind::FnSig(sig) => {
                let params: Vec<_> = sig
                    .params
                    .iter()
                    .map(|p| self.display_type(self.decl(*p).vtype))
                    .collect();
                format!("fn({}): {}", params.join(", "), self.display_type(sig.ret))
            }
            TypeKind::Perm(flags) => match self.builtins().perm_kind(ty) {
                Some(perm) => perm.name().to_string(),
                None => format!("perm({:?})", flags),
            },
            TypeKind::Region(name) => self.name(*name).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PermKind;

    fn slice_of(program: &mut Program, pointee: TypeId) -> TypeId {
        let void = program.builtins().void;
        let imm = program.builtins().perm(PermKind::Imm);
        let r = program.new_ref(void, imm, pointee, Span::default());
        program.mark_slice(r);
        r
    }

    fn fat_parts(program: &Program, slice: TypeId) -> (TypeId, TypeId) {
        let fat = program.ref_type(slice).unwrap().fat_ptr.expect("slice has a fat pointer");
        match &program.ty(fat).kind {
            TypeKind::Tuple(parts) => {
                assert_eq!(parts.len(), 2);
                (parts[0], parts[1])
            }
            other => panic!("expected tuple, found {:?}", other),
        }
    }

    #[test]
    fn test_slice_fat_pointer_layout() {
        let mut program = Program::new();
        let i32_ty = program.builtins().prim(PrimType::I32);
        let slice = slice_of(&mut program, i32_ty);

        let (ptr, size) = fat_parts(&program, slice);
        assert_eq!(program.ty(ptr).kind, TypeKind::Ptr { pointee: i32_ty });
        assert_eq!(program.prim_type(size), Some(PrimType::Usize));
        assert!(program.ref_type(slice).unwrap().slice);
    }

    #[test]
    fn test_set_pointee_regenerates_tuple() {
        let mut program = Program::new();
        let i32_ty = program.builtins().prim(PrimType::I32);
        let f64_ty = program.builtins().prim(PrimType::F64);
        let slice = slice_of(&mut program, i32_ty);

        program.set_pointee(slice, f64_ty);
        let (ptr, size) = fat_parts(&program, slice);
        assert_eq!(program.ty(ptr).kind, TypeKind::Ptr { pointee: f64_ty });
        assert_eq!(program.prim_type(size), Some(PrimType::Usize));

        // re-marking after a direct edit also picks up the new pointee
        if let TypeKind::Ref(r) = &mut program.ty_mut(slice).kind {
            r.pointee = i32_ty;
        }
        program.mark_slice(slice);
        let (ptr, _) = fat_parts(&program, slice);
        assert_eq!(program.ty(ptr).kind, TypeKind::Ptr { pointee: i32_ty });
    }

    #[test]
    fn test_clear_slice_drops_tuple() {
        let mut program = Program::new();
        let i32_ty = program.builtins().prim(PrimType::I32);
        let slice = slice_of(&mut program, i32_ty);

        program.clear_slice(slice);
        let r = program.ref_type(slice).unwrap();
        assert!(!r.slice);
        assert!(r.fat_ptr.is_none());
    }

    #[test]
    fn test_unique_flags() {
        assert!(PermKind::Uni.flags().is_unique());
        assert!(!PermKind::Mut.flags().is_unique());
        assert!(!PermKind::Imm.flags().is_unique());
    }

    #[test]
    fn test_display_slice() {
        let mut program = Program::new();
        let i32_ty = program.builtins().prim(PrimType::I32);
        let slice = slice_of(&mut program, i32_ty);
        assert_eq!(program.display_type(slice), "&imm []i32");
    }
}
