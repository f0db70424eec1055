//! Type, permission and region compatibility
//!
//! [`TypeMatcher::matches`] decides whether a value of type `from` may be used
//! where `to` is expected. It only classifies: whether a [`TypeCompare::NoMatch`]
//! is an error, or a [`TypeCompare::ConvSubtype`] needs an explicit `as`, is up
//! to the caller.

use crate::ir::{PermFlags, PrimType, Program, RefType, TypeId, TypeKind};

/// Classification of a coercion, ordered from strictest to loosest.
/// Folding two sub-results is therefore `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeCompare {
    /// Identical types
    EqMatch,
    /// Implicit, always safe widening
    CastSubtype,
    /// Needs an explicit conversion
    ConvSubtype,
    NoMatch,
}

impl TypeCompare {
    /// Accepted without an explicit conversion
    pub fn is_implicit(self) -> bool {
        matches!(self, TypeCompare::EqMatch | TypeCompare::CastSubtype)
    }
}

/// Context of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubtypeConstraint {
    /// Assignment, argument passing and other ordinary use sites
    #[default]
    Coercion,
    /// Generic instantiation, where looser consistent matches are tolerated
    Monomorph,
}

/// How subtyping of a referent carries over to references to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variance {
    Covariant,
    Contravariant,
    Invariant,
}

impl Variance {
    /// Read-only or no-access references are covariant, write-only ones
    /// contravariant, and read-write references invariant.
    pub fn of(flags: PermFlags) -> Self {
        let read_write = PermFlags::MAY_READ | PermFlags::MAY_WRITE;
        let access = flags & read_write;
        if access == read_write {
            Variance::Invariant
        } else if access == PermFlags::MAY_WRITE {
            Variance::Contravariant
        } else {
            Variance::Covariant
        }
    }
}

/// Compatibility queries over one program's types
pub struct TypeMatcher<'a> {
    program: &'a Program,
}

impl<'a> TypeMatcher<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self { program }
    }

    /// Structural identity
    pub fn is_same(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.program.type_decl(a);
        let b = self.program.type_decl(b);
        if a == b {
            return true;
        }

        match (&self.program.ty(a).kind, &self.program.ty(b).kind) {
            (TypeKind::Void, TypeKind::Void) | (TypeKind::Infer, TypeKind::Infer) => true,
            // Unresolved names compare by spelling
            (TypeKind::Name(x), TypeKind::Name(y)) => x.name == y.name,
            (TypeKind::Prim(x), TypeKind::Prim(y)) => x == y,
            (TypeKind::Perm(x), TypeKind::Perm(y)) => x == y,
            (TypeKind::Region(x), TypeKind::Region(y)) => x == y,
            (TypeKind::Array { elem: e1, len: l1 }, TypeKind::Array { elem: e2, len: l2 }) => {
                l1 == l2 && self.is_same(*e1, *e2)
            }
            (TypeKind::Ptr { pointee: p1 }, TypeKind::Ptr { pointee: p2 }) => self.is_same(*p1, *p2),
            (TypeKind::Ref(r1), TypeKind::Ref(r2)) => {
                r1.nullable == r2.nullable
                    && r1.slice == r2.slice
                    && self.is_same(r1.region, r2.region)
                    && self.program.perm_flags(r1.perm) == self.program.perm_flags(r2.perm)
                    && self.is_same(r1.pointee, r2.pointee)
            }
            (TypeKind::Tuple(t1), TypeKind::Tuple(t2)) => {
                t1.len() == t2.len() && t1.iter().zip(t2).all(|(x, y)| self.is_same(*x, *y))
            }
            (TypeKind::FnSig(s1), TypeKind::FnSig(s2)) => {
                s1.params.len() == s2.params.len()
                    && self.is_same(s1.ret, s2.ret)
                    && s1.params.iter().zip(&s2.params).all(|(p1, p2)| {
                        self.is_same(self.program.decl(*p1).vtype, self.program.decl(*p2).vtype)
                    })
            }
            // Structs are nominal
            _ => false,
        }
    }

    /// Can a `from` value be used where `to` is expected?
    pub fn matches(&self, to: TypeId, from: TypeId, constraint: SubtypeConstraint) -> TypeCompare {
        if self.is_same(to, from) {
            return TypeCompare::EqMatch;
        }

        let result = match (self.program.kind_of(to), self.program.kind_of(from)) {
            (TypeKind::Ref(t), TypeKind::Ref(f)) => match (t.slice, f.slice) {
                (true, true) => self.array_ref_matches(t, f, constraint),
                (true, false) => self.array_ref_matches_ref(t, f, constraint),
                // A slice never silently loses its length
                (false, true) => TypeCompare::NoMatch,
                (false, false) => self.ref_matches(t, f, constraint),
            },
            (TypeKind::Prim(t), TypeKind::Prim(f)) => Self::prim_matches(*t, *f),
            (TypeKind::Struct(_), TypeKind::Struct(_)) => self.struct_matches(to, from),
            _ => TypeCompare::NoMatch,
        };

        tracing::trace!(
            to = %self.program.display_type(to),
            from = %self.program.display_type(from),
            ?result,
            "type match"
        );
        result
    }

    /// Plain reference to plain reference.
    ///
    /// The pointee follows the permission's variance: a read-write reference
    /// only accepts an identical pointee, and a pointee that needs a
    /// conversion keeps [`TypeCompare::ConvSubtype`] instead of passing as a cast.
    pub fn ref_matches(&self, to: &RefType, from: &RefType, constraint: SubtypeConstraint) -> TypeCompare {
        let perm = self.perm_matches(to.perm, from.perm);
        if perm == TypeCompare::NoMatch {
            return TypeCompare::NoMatch;
        }
        let region = self.region_matches(to.region, from.region);
        if region == TypeCompare::NoMatch {
            return TypeCompare::NoMatch;
        }
        if to.slice != from.slice || (from.nullable && !to.nullable) {
            return TypeCompare::NoMatch;
        }
        let nullable = if to.nullable == from.nullable {
            TypeCompare::EqMatch
        } else {
            TypeCompare::CastSubtype
        };

        let variance = Variance::of(self.program.perm_flags(to.perm));
        let pointee = self.variant_matches(variance, to.pointee, from.pointee, constraint);
        if pointee == TypeCompare::NoMatch {
            return TypeCompare::NoMatch;
        }

        perm.max(region).max(nullable).max(pointee)
    }

    /// Slice to slice
    pub fn array_ref_matches(&self, to: &RefType, from: &RefType, constraint: SubtypeConstraint) -> TypeCompare {
        self.ref_matches(to, from, constraint)
    }

    /// Reference to an array, used as a slice. Never better than
    /// [`TypeCompare::ConvSubtype`].
    pub fn array_ref_matches_ref(
        &self,
        to: &RefType,
        from: &RefType,
        constraint: SubtypeConstraint,
    ) -> TypeCompare {
        let TypeKind::Array { elem, .. } = self.program.kind_of(from.pointee) else {
            return TypeCompare::NoMatch;
        };
        if from.nullable && !to.nullable {
            return TypeCompare::NoMatch;
        }

        let mut result = self.region_matches(to.region, from.region);
        if result == TypeCompare::NoMatch {
            return TypeCompare::NoMatch;
        }

        match self.perm_matches(to.perm, from.perm) {
            TypeCompare::NoMatch => return TypeCompare::NoMatch,
            TypeCompare::CastSubtype => result = TypeCompare::CastSubtype,
            _ => {}
        }
        result = result.max(TypeCompare::ConvSubtype);

        let variance = Variance::of(self.program.perm_flags(to.perm));
        if variance == Variance::Invariant {
            return if self.is_same(to.pointee, *elem) {
                result
            } else {
                TypeCompare::NoMatch
            };
        }

        match self.variant_matches(variance, to.pointee, *elem, constraint) {
            TypeCompare::EqMatch => result,
            TypeCompare::CastSubtype => TypeCompare::ConvSubtype,
            TypeCompare::ConvSubtype if constraint == SubtypeConstraint::Monomorph => {
                TypeCompare::ConvSubtype
            }
            TypeCompare::ConvSubtype | TypeCompare::NoMatch => TypeCompare::NoMatch,
        }
    }

    /// May a reference holding `from` be lent as `to`?
    pub fn perm_matches(&self, to: TypeId, from: TypeId) -> TypeCompare {
        let to = self.program.perm_flags(to);
        let from = self.program.perm_flags(from);

        if to == from {
            return TypeCompare::EqMatch;
        }

        let read_write = PermFlags::MAY_READ | PermFlags::MAY_WRITE;
        let widens = from.is_unique()
            || !to.intersects(read_write)
            || (to == PermFlags::MAY_READ | PermFlags::MAY_ALIAS && from.contains(PermFlags::MAY_READ))
            || (to == PermFlags::MAY_WRITE && from.contains(PermFlags::MAY_WRITE));

        if widens {
            TypeCompare::CastSubtype
        } else {
            TypeCompare::NoMatch
        }
    }

    /// The void region accepts references into any region
    pub fn region_matches(&self, to: TypeId, from: TypeId) -> TypeCompare {
        if self.is_same(to, from) {
            TypeCompare::EqMatch
        } else if self.program.is_void(to) {
            TypeCompare::CastSubtype
        } else {
            TypeCompare::NoMatch
        }
    }

    fn variant_matches(
        &self,
        variance: Variance,
        to: TypeId,
        from: TypeId,
        constraint: SubtypeConstraint,
    ) -> TypeCompare {
        match variance {
            Variance::Covariant => self.matches(to, from, constraint),
            Variance::Contravariant => self.matches(from, to, constraint),
            Variance::Invariant => {
                if self.is_same(to, from) {
                    TypeCompare::EqMatch
                } else {
                    TypeCompare::NoMatch
                }
            }
        }
    }

    fn prim_matches(to: PrimType, from: PrimType) -> TypeCompare {
        let widens = if to.is_int() && from.is_int() {
            to.bits() > from.bits() && (to.is_signed() == from.is_signed() || to.is_signed())
        } else {
            to == PrimType::F64 && from == PrimType::F32
        };

        if widens {
            TypeCompare::CastSubtype
        } else {
            TypeCompare::NoMatch
        }
    }

    /// A struct matches any struct on its base chain
    fn struct_matches(&self, to: TypeId, from: TypeId) -> TypeCompare {
        let to = self.program.type_decl(to);
        let mut current = self.program.type_decl(from);
        let mut depth = 0;

        while let TypeKind::Struct(st) = &self.program.ty(current).kind {
            let Some(base) = st.base else { break };
            current = self.program.type_decl(base);
            if current == to {
                return TypeCompare::CastSubtype;
            }
            // Cyclic base chains are reported elsewhere
            depth += 1;
            if depth > 64 {
                break;
            }
        }
        TypeCompare::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Span;
    use crate::ir::{PermKind, StructType};
    use pretty_assertions::assert_eq;

    struct Fixture {
        program: Program,
        base: TypeId,
        derived: TypeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut program = Program::new();
            let base_name = program.intern("Base");
            let base = program.add_type(
                TypeKind::Struct(StructType { name: base_name, base: None, fields: Vec::new() }),
                Span::default(),
            );
            let derived_name = program.intern("Derived");
            let derived = program.add_type(
                TypeKind::Struct(StructType { name: derived_name, base: Some(base), fields: Vec::new() }),
                Span::default(),
            );
            Self { program, base, derived }
        }

        fn reference(&mut self, perm: PermKind, pointee: TypeId) -> TypeId {
            let void = self.program.builtins().void;
            let perm = self.program.builtins().perm(perm);
            self.program.new_ref(void, perm, pointee, Span::default())
        }

        fn slice(&mut self, perm: PermKind, elem: TypeId) -> TypeId {
            let r = self.reference(perm, elem);
            self.program.mark_slice(r);
            r
        }

        fn array_ref(&mut self, perm: PermKind, elem: TypeId) -> TypeId {
            let array = self.program.add_type(TypeKind::Array { elem, len: 4 }, Span::default());
            self.reference(perm, array)
        }

        fn in_region(&mut self, name: &str, perm: PermKind, pointee: TypeId) -> TypeId {
            let symbol = self.program.intern(name);
            let region = self.program.add_type(TypeKind::Region(symbol), Span::default());
            let perm = self.program.builtins().perm(perm);
            self.program.new_ref(region, perm, pointee, Span::default())
        }

        fn prim(&self, prim: PrimType) -> TypeId {
            self.program.builtins().prim(prim)
        }

        fn matches(&self, to: TypeId, from: TypeId) -> TypeCompare {
            TypeMatcher::new(&self.program).matches(to, from, SubtypeConstraint::Coercion)
        }
    }

    #[test]
    fn test_variance_from_flags() {
        assert_eq!(Variance::of(PermKind::Imm.flags()), Variance::Covariant);
        assert_eq!(Variance::of(PermKind::Const.flags()), Variance::Covariant);
        assert_eq!(Variance::of(PermKind::Opaq.flags()), Variance::Covariant);
        assert_eq!(Variance::of(PermKind::Out.flags()), Variance::Contravariant);
        assert_eq!(Variance::of(PermKind::Mut.flags()), Variance::Invariant);
        assert_eq!(Variance::of(PermKind::Uni.flags()), Variance::Invariant);
    }

    #[test]
    fn test_reflexive_on_reference_shapes() {
        let mut f = Fixture::new();
        let i32_ty = f.prim(PrimType::I32);
        let derived = f.derived;

        let nullable = f.slice(PermKind::Imm, derived);
        if let TypeKind::Ref(r) = &mut f.program.ty_mut(nullable).kind {
            r.nullable = true;
        }

        let shapes = [
            f.reference(PermKind::Const, i32_ty),
            f.reference(PermKind::Mut, f.base),
            nullable,
            f.array_ref(PermKind::Uni, i32_ty),
            f.in_region("heap", PermKind::Out, derived),
        ];
        for ty in shapes {
            assert_eq!(f.matches(ty, ty), TypeCompare::EqMatch, "{}", f.program.display_type(ty));
        }

        // separately built but identical
        let a = f.slice(PermKind::Imm, i32_ty);
        let b = f.slice(PermKind::Imm, i32_ty);
        assert_eq!(f.matches(a, b), TypeCompare::EqMatch);
    }

    #[test]
    fn test_array_ref_to_slice_variance_matrix() {
        let mut f = Fixture::new();
        let (base, derived) = (f.base, f.derived);

        // read-only: covariant
        let to = f.slice(PermKind::Imm, base);
        let from = f.array_ref(PermKind::Imm, derived);
        assert_eq!(f.matches(to, from), TypeCompare::ConvSubtype);
        let to = f.slice(PermKind::Imm, derived);
        let from = f.array_ref(PermKind::Imm, base);
        assert_eq!(f.matches(to, from), TypeCompare::NoMatch);

        // write-only: contravariant
        let to = f.slice(PermKind::Out, derived);
        let from = f.array_ref(PermKind::Mut, base);
        assert_eq!(f.matches(to, from), TypeCompare::ConvSubtype);
        let to = f.slice(PermKind::Out, base);
        let from = f.array_ref(PermKind::Mut, derived);
        assert_eq!(f.matches(to, from), TypeCompare::NoMatch);

        // read-write: invariant
        let to = f.slice(PermKind::Mut, base);
        let from = f.array_ref(PermKind::Mut, base);
        assert_eq!(f.matches(to, from), TypeCompare::ConvSubtype);
        let from = f.array_ref(PermKind::Mut, derived);
        assert_eq!(f.matches(to, from), TypeCompare::NoMatch);
        let to = f.slice(PermKind::Mut, derived);
        let from = f.array_ref(PermKind::Mut, base);
        assert_eq!(f.matches(to, from), TypeCompare::NoMatch);
    }

    #[test]
    fn test_array_ref_to_slice_is_never_implicit() {
        let mut f = Fixture::new();
        let i32_ty = f.prim(PrimType::I32);
        let to = f.slice(PermKind::Imm, i32_ty);
        let from = f.array_ref(PermKind::Imm, i32_ty);
        assert_eq!(f.matches(to, from), TypeCompare::ConvSubtype);

        // only references to arrays qualify
        let plain = f.reference(PermKind::Imm, i32_ty);
        assert_eq!(f.matches(to, plain), TypeCompare::NoMatch);
    }

    #[test]
    fn test_monomorph_tolerates_looser_element() {
        let mut f = Fixture::new();
        let i32_ty = f.prim(PrimType::I32);

        // elements are themselves an array reference and a slice
        let inner_slice = f.slice(PermKind::Imm, i32_ty);
        let inner_array_ref = f.array_ref(PermKind::Imm, i32_ty);
        let to = f.slice(PermKind::Imm, inner_slice);
        let from = f.array_ref(PermKind::Imm, inner_array_ref);

        let matcher = TypeMatcher::new(&f.program);
        assert_eq!(matcher.matches(inner_slice, inner_array_ref, SubtypeConstraint::Coercion), TypeCompare::ConvSubtype);
        assert_eq!(matcher.matches(to, from, SubtypeConstraint::Coercion), TypeCompare::NoMatch);
        assert_eq!(matcher.matches(to, from, SubtypeConstraint::Monomorph), TypeCompare::ConvSubtype);
    }

    #[test]
    fn test_plain_ref_variance() {
        let mut f = Fixture::new();
        let (base, derived) = (f.base, f.derived);

        let to = f.reference(PermKind::Imm, base);
        let from = f.reference(PermKind::Imm, derived);
        assert_eq!(f.matches(to, from), TypeCompare::CastSubtype);
        assert_eq!(f.matches(from, to), TypeCompare::NoMatch);

        let to = f.reference(PermKind::Mut, base);
        let from = f.reference(PermKind::Mut, derived);
        assert_eq!(f.matches(to, from), TypeCompare::NoMatch);

        let to = f.reference(PermKind::Out, derived);
        let from = f.reference(PermKind::Out, base);
        assert_eq!(f.matches(to, from), TypeCompare::CastSubtype);
    }

    #[test]
    fn test_ref_permission_and_region() {
        let mut f = Fixture::new();
        let i32_ty = f.prim(PrimType::I32);

        let const_ref = f.reference(PermKind::Const, i32_ty);
        let mut_ref = f.reference(PermKind::Mut, i32_ty);
        assert_eq!(f.matches(const_ref, mut_ref), TypeCompare::CastSubtype);
        assert_eq!(f.matches(mut_ref, const_ref), TypeCompare::NoMatch);

        let heap = f.in_region("heap", PermKind::Const, i32_ty);
        let arena = f.in_region("arena", PermKind::Const, i32_ty);
        assert_eq!(f.matches(heap, arena), TypeCompare::NoMatch);
        assert_eq!(f.matches(const_ref, heap), TypeCompare::CastSubtype);
        assert_eq!(f.matches(heap, const_ref), TypeCompare::NoMatch);
    }

    #[test]
    fn test_slice_and_nullability_mismatch() {
        let mut f = Fixture::new();
        let i32_ty = f.prim(PrimType::I32);

        let slice = f.slice(PermKind::Imm, i32_ty);
        let plain = f.reference(PermKind::Imm, i32_ty);
        assert_eq!(f.matches(plain, slice), TypeCompare::NoMatch);

        let nullable = f.reference(PermKind::Imm, i32_ty);
        if let TypeKind::Ref(r) = &mut f.program.ty_mut(nullable).kind {
            r.nullable = true;
        }
        assert_eq!(f.matches(nullable, plain), TypeCompare::CastSubtype);
        assert_eq!(f.matches(plain, nullable), TypeCompare::NoMatch);
    }

    #[test]
    fn test_slice_to_slice_follows_reference_rule() {
        let mut f = Fixture::new();
        let (base, derived) = (f.base, f.derived);
        let to = f.slice(PermKind::Imm, base);
        let from = f.slice(PermKind::Imm, derived);
        assert_eq!(f.matches(to, from), TypeCompare::CastSubtype);

        let from = f.slice(PermKind::Uni, base);
        assert_eq!(f.matches(to, from), TypeCompare::CastSubtype);
    }

    #[test]
    fn test_perm_matches_table() {
        let f = Fixture::new();
        let matcher = TypeMatcher::new(&f.program);
        let perm = |kind| f.program.builtins().perm(kind);
        use PermKind::*;
        use TypeCompare::*;

        let cases = [
            (Imm, Imm, EqMatch),
            (Mut, Uni, CastSubtype),
            (Imm, Uni, CastSubtype),
            (Const, Imm, CastSubtype),
            (Const, Mut, CastSubtype),
            (Out, Mut, CastSubtype),
            (Opaq, Imm, CastSubtype),
            (Imm, Mut, NoMatch),
            (Mut, Imm, NoMatch),
            (Uni, Mut, NoMatch),
            (Out, Const, NoMatch),
            (Const, Out, NoMatch),
        ];
        for (to, from, expected) in cases {
            assert_eq!(matcher.perm_matches(perm(to), perm(from)), expected, "{:?} <- {:?}", to, from);
        }
    }

    #[test]
    fn test_scalar_and_struct_widening() {
        let f = Fixture::new();
        use PrimType::*;

        assert_eq!(f.matches(f.prim(I64), f.prim(I32)), TypeCompare::CastSubtype);
        assert_eq!(f.matches(f.prim(I32), f.prim(U16)), TypeCompare::CastSubtype);
        assert_eq!(f.matches(f.prim(U32), f.prim(I16)), TypeCompare::NoMatch);
        assert_eq!(f.matches(f.prim(I32), f.prim(I64)), TypeCompare::NoMatch);
        assert_eq!(f.matches(f.prim(F64), f.prim(F32)), TypeCompare::CastSubtype);
        assert_eq!(f.matches(f.prim(F64), f.prim(I32)), TypeCompare::NoMatch);
        assert_eq!(f.matches(f.prim(Bool), f.prim(U8)), TypeCompare::NoMatch);

        assert_eq!(f.matches(f.base, f.derived), TypeCompare::CastSubtype);
        assert_eq!(f.matches(f.derived, f.base), TypeCompare::NoMatch);
    }
}
