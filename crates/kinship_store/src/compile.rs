use sea_orm::DatabaseBackend;
use sea_orm::sea_query::{
    Alias, Cond, Condition, Expr, Func, JoinType, LikeExpr, Order, Query, SelectStatement,
    SimpleExpr,
};

use kinship_core::{
    Atom, AttributeRegistry, Caller, CandidateKind, Capability, FacetKey, FacetPlan, Filters, Hop,
    KinshipError, KinshipResult, PUBLISHED_THRESHOLD, Predicate, PropertyMatch, Selection,
    entity_selection, relation_selection, relation_visibility,
};

use crate::codec::{id_value, sea_value, value_column};
use crate::db::*;

pub(crate) const FACET_ENTITY: &str = "fe";
const FACET_RELATION: &str = "fr";
const FACET_KEY: &str = "fk";
const FACET_LINK: &str = "fl";
pub(crate) const FACET_COUNT: &str = "facet_count";

const NAME_PROPERTY: &str = "name";
const LIKE_ESCAPE: char = '!';

fn candidate_id(kind: CandidateKind, alias: &Alias) -> Expr {
    match kind {
        CandidateKind::Entity => Expr::col((alias.clone(), KinshipEntities::EntityId)),
        CandidateKind::Relation => Expr::col((alias.clone(), KinshipRelations::RelationId)),
    }
}

fn candidate_project(kind: CandidateKind, alias: &Alias) -> Expr {
    match kind {
        CandidateKind::Entity => Expr::col((alias.clone(), KinshipEntities::ProjectId)),
        CandidateKind::Relation => Expr::col((alias.clone(), KinshipRelations::ProjectId)),
    }
}

fn property_owner(kind: CandidateKind, alias: &Alias) -> Expr {
    match kind {
        CandidateKind::Entity => Expr::col((alias.clone(), KinshipEntityProperties::EntityId)),
        CandidateKind::Relation => Expr::col((alias.clone(), KinshipRelationProperties::RelationId)),
    }
}

fn from_property_table(select: &mut SelectStatement, kind: CandidateKind, alias: &Alias) {
    match kind {
        CandidateKind::Entity => select.from_as(KinshipEntityProperties::Table, alias.clone()),
        CandidateKind::Relation => select.from_as(KinshipRelationProperties::Table, alias.clone()),
    };
}

fn constant(value: bool) -> Condition {
    let sql = if value { "1 = 1" } else { "1 = 0" };
    Cond::all().add(Expr::cust(sql))
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

struct SelectionCompiler {
    alias: String,
    kind: CandidateKind,
    backend: DatabaseBackend,
    counter: usize,
}

impl SelectionCompiler {
    fn new(alias: &str, kind: CandidateKind, backend: DatabaseBackend) -> Self {
        Self {
            alias: alias.to_string(),
            kind,
            backend,
            counter: 0,
        }
    }

    fn candidate(&self) -> Alias {
        Alias::new(self.alias.clone())
    }

    fn project(&self) -> Alias {
        Alias::new(format!("{}_project", self.alias))
    }

    fn sub_alias(&mut self, tag: &str) -> Alias {
        self.counter += 1;
        Alias::new(format!("{}_{}{}", self.alias, tag, self.counter))
    }

    fn unsupported(&self, atom: &Atom) -> KinshipError {
        KinshipError::storage(format!(
            "{atom:?} does not apply to {} candidates",
            self.kind.as_str()
        ))
    }

    fn condition(&mut self, predicate: &Predicate) -> KinshipResult<Condition> {
        match predicate {
            Predicate::True => Ok(constant(true)),
            Predicate::False => Ok(constant(false)),
            Predicate::And(parts) if parts.is_empty() => Ok(constant(true)),
            Predicate::Or(parts) if parts.is_empty() => Ok(constant(false)),
            Predicate::And(parts) => {
                let mut cond = Cond::all();
                for part in parts {
                    cond = cond.add(self.condition(part)?);
                }
                Ok(cond)
            }
            Predicate::Or(parts) => {
                let mut cond = Cond::any();
                for part in parts {
                    cond = cond.add(self.condition(part)?);
                }
                Ok(cond)
            }
            Predicate::Atom(atom) => Ok(Cond::all().add(self.atom(atom)?)),
        }
    }

    fn atom(&mut self, atom: &Atom) -> KinshipResult<SimpleExpr> {
        let candidate = self.candidate();
        match (atom, self.kind) {
            (Atom::ProjectPublic, _) => {
                Ok(Expr::col((self.project(), KinshipProjects::Private)).eq(false))
            }
            (Atom::Published, CandidateKind::Entity) => Ok(Expr::col((
                candidate,
                KinshipEntities::Status,
            ))
            .gte(PUBLISHED_THRESHOLD)),
            (
                Atom::Grant {
                    account,
                    capability,
                },
                _,
            ) => {
                let perm = self.sub_alias("perm");
                let granted = match capability {
                    Capability::Reader => KinshipPermissions::Reader,
                    Capability::Editor => KinshipPermissions::Editor,
                };
                let sub = Query::select()
                    .expr(Expr::val(1))
                    .from_as(KinshipPermissions::Table, perm.clone())
                    .cond_where(
                        Cond::all()
                            .add(
                                Expr::col((perm.clone(), KinshipPermissions::ProjectId))
                                    .equals((self.project(), KinshipProjects::ProjectId)),
                            )
                            .add(
                                Expr::col((perm.clone(), KinshipPermissions::AccountId))
                                    .eq(id_value(self.backend, account.0)),
                            )
                            .add(Expr::col((perm, granted)).eq(true)),
                    )
                    .to_owned();
                Ok(Expr::exists(sub))
            }
            (Atom::NotMerged, CandidateKind::Entity) => {
                Ok(Expr::col((candidate, KinshipEntities::SameAsId)).is_null())
            }
            (Atom::ProjectSlug(slug), _) => {
                Ok(Expr::col((self.project(), KinshipProjects::Slug)).eq(slug.as_str()))
            }
            (Atom::SchemaIn(names), CandidateKind::Entity) => {
                let link = self.sub_alias("es");
                let schema = self.sub_alias("s");
                let sub = Query::select()
                    .expr(Expr::val(1))
                    .from_as(KinshipEntitySchemas::Table, link.clone())
                    .join_as(
                        JoinType::InnerJoin,
                        KinshipSchemas::Table,
                        schema.clone(),
                        Expr::col((schema.clone(), KinshipSchemas::SchemaId))
                            .equals((link.clone(), KinshipEntitySchemas::SchemaId)),
                    )
                    .cond_where(
                        Cond::all()
                            .add(
                                Expr::col((link, KinshipEntitySchemas::EntityId))
                                    .equals((candidate, KinshipEntities::EntityId)),
                            )
                            .add(
                                Expr::col((schema, KinshipSchemas::Name))
                                    .is_in(names.iter().cloned()),
                            ),
                    )
                    .to_owned();
                Ok(Expr::exists(sub))
            }
            (Atom::SchemaIn(names), CandidateKind::Relation) => {
                let schema = self.sub_alias("s");
                let sub = Query::select()
                    .expr(Expr::val(1))
                    .from_as(KinshipSchemas::Table, schema.clone())
                    .cond_where(
                        Cond::all()
                            .add(
                                Expr::col((schema.clone(), KinshipSchemas::SchemaId))
                                    .equals((candidate, KinshipRelations::SchemaId)),
                            )
                            .add(
                                Expr::col((schema, KinshipSchemas::Name))
                                    .is_in(names.iter().cloned()),
                            ),
                    )
                    .to_owned();
                Ok(Expr::exists(sub))
            }
            (Atom::SourceIs(entity), CandidateKind::Relation) => Ok(Expr::col((
                candidate,
                KinshipRelations::SourceId,
            ))
            .eq(id_value(self.backend, entity.0))),
            (Atom::TargetIs(entity), CandidateKind::Relation) => Ok(Expr::col((
                candidate,
                KinshipRelations::TargetId,
            ))
            .eq(id_value(self.backend, entity.0))),
            (Atom::NameContains(text), CandidateKind::Entity) => {
                let prop = self.sub_alias("name");
                let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
                let mut sub = Query::select();
                sub.expr(Expr::val(1));
                from_property_table(&mut sub, self.kind, &prop);
                sub.cond_where(
                    Cond::all()
                        .add(property_owner(self.kind, &prop).eq(candidate_id(self.kind, &candidate)))
                        .add(Expr::col((prop.clone(), PropertyColumn::Name)).eq(NAME_PROPERTY))
                        .add(Expr::col((prop.clone(), PropertyColumn::Active)).eq(true))
                        .add(
                            Expr::col((prop, PropertyColumn::SearchText))
                                .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)),
                        ),
                );
                Ok(Expr::exists(sub))
            }
            (Atom::Property(matcher), _) => Ok(self.property(matcher, &candidate)),
            (other, _) => Err(self.unsupported(other)),
        }
    }

    fn property(&mut self, matcher: &PropertyMatch, candidate: &Alias) -> SimpleExpr {
        let prop = self.sub_alias("prop");
        let mut alternatives = Cond::any();
        for alternative in &matcher.alternatives {
            alternatives = alternatives.add(
                Cond::all()
                    .add(
                        Expr::col((prop.clone(), PropertyColumn::AttributeId))
                            .eq(id_value(self.backend, alternative.attribute_id.0)),
                    )
                    .add(
                        Expr::col((prop.clone(), value_column(alternative.value.column())))
                            .eq(sea_value(&alternative.value)),
                    ),
            );
        }
        if matcher.alternatives.is_empty() {
            alternatives = constant(false);
        }
        let mut cond = Cond::all()
            .add(property_owner(self.kind, &prop).eq(candidate_id(self.kind, candidate)))
            .add(Expr::col((prop.clone(), PropertyColumn::Name)).eq(matcher.name.as_str()))
            .add(alternatives);
        if matcher.only_active {
            cond = cond.add(Expr::col((prop.clone(), PropertyColumn::Active)).eq(true));
        }
        let mut sub = Query::select();
        sub.expr(Expr::val(1));
        from_property_table(&mut sub, self.kind, &prop);
        sub.cond_where(cond);
        Expr::exists(sub)
    }
}

/// Compiles `selection` onto `select`, whose candidate table is aliased `alias`.
///
/// The candidate's project is inner-joined as `{alias}_project`; every other atom
/// becomes a column test or a correlated `EXISTS`, so rows are never duplicated.
/// Conditions are added with `cond_where`; `select` must not use `and_where`.
pub fn apply_selection(
    select: &mut SelectStatement,
    alias: &str,
    selection: &Selection,
    backend: DatabaseBackend,
) -> KinshipResult<()> {
    let mut compiler = SelectionCompiler::new(alias, selection.kind, backend);
    let project = compiler.project();
    select.join_as(
        JoinType::InnerJoin,
        KinshipProjects::Table,
        project.clone(),
        Expr::col((project, KinshipProjects::ProjectId))
            .eq(candidate_project(selection.kind, &compiler.candidate())),
    );
    let condition = compiler.condition(&selection.predicate)?;
    select.cond_where(condition);
    Ok(())
}

/// Restricts `base` (entities aliased `alias`) to what `caller` may read and `filters` ask for.
pub fn build_entity_query(
    base: SelectStatement,
    alias: &str,
    caller: &Caller,
    filters: &Filters,
    registry: &dyn AttributeRegistry,
    backend: DatabaseBackend,
) -> KinshipResult<SelectStatement> {
    let selection = entity_selection(caller, filters, registry)?;
    let mut select = base;
    apply_selection(&mut select, alias, &selection, backend)?;
    Ok(select)
}

/// Restricts `base` (relations aliased `alias`) to what `caller` may read and `filters` ask for.
pub fn build_relation_query(
    base: SelectStatement,
    alias: &str,
    caller: &Caller,
    filters: &Filters,
    registry: &dyn AttributeRegistry,
    backend: DatabaseBackend,
) -> KinshipResult<SelectStatement> {
    let selection = relation_selection(caller, filters, registry)?;
    let mut select = base;
    apply_selection(&mut select, alias, &selection, backend)?;
    Ok(select)
}

/// Grouped count of visible, filtered entities by the key `plan` resolves to.
///
/// Columns: `facet_count` plus the key columns (`facet_project_id`, `facet_slug`,
/// `facet_label`; `facet_schema_id`, `facet_name`, `facet_label`; or the five
/// `facet_value_*` columns).
pub fn facet_statement(
    plan: &FacetPlan,
    caller: &Caller,
    filters: &Filters,
    registry: &dyn AttributeRegistry,
    backend: DatabaseBackend,
) -> KinshipResult<SelectStatement> {
    let entity = Alias::new(FACET_ENTITY);
    let base = Query::select()
        .from_as(KinshipEntities::Table, entity.clone())
        .to_owned();
    let mut select = build_entity_query(base, FACET_ENTITY, caller, filters, registry, backend)?;

    let keyed = match plan.hop {
        None => entity.clone(),
        Some(hop) => {
            let relation = Alias::new(FACET_RELATION);
            let endpoint = match hop {
                Hop::Outgoing => KinshipRelations::SourceId,
                Hop::Incoming => KinshipRelations::TargetId,
            };
            select.join_as(
                JoinType::InnerJoin,
                KinshipRelations::Table,
                relation.clone(),
                Expr::col((relation.clone(), endpoint))
                    .equals((entity.clone(), KinshipEntities::EntityId)),
            );
            let visible =
                Selection::new(CandidateKind::Relation).filter(relation_visibility(caller));
            apply_selection(&mut select, FACET_RELATION, &visible, backend)?;
            relation
        }
    };
    let kind = plan.key_kind();
    let key = Alias::new(FACET_KEY);

    select
        .expr_as(
            Func::count_distinct(Expr::col((entity, KinshipEntities::EntityId))),
            Alias::new(FACET_COUNT),
        )
        .order_by(Alias::new(FACET_COUNT), Order::Desc);

    match &plan.key {
        FacetKey::Project => {
            select
                .join_as(
                    JoinType::InnerJoin,
                    KinshipProjects::Table,
                    key.clone(),
                    Expr::col((key.clone(), KinshipProjects::ProjectId))
                        .eq(candidate_project(kind, &keyed)),
                )
                .expr_as(
                    Expr::col((key.clone(), KinshipProjects::ProjectId)),
                    Alias::new("facet_project_id"),
                )
                .expr_as(
                    Expr::col((key.clone(), KinshipProjects::Slug)),
                    Alias::new("facet_slug"),
                )
                .expr_as(
                    Expr::col((key.clone(), KinshipProjects::Label)),
                    Alias::new("facet_label"),
                )
                .group_by_col((key.clone(), KinshipProjects::ProjectId))
                .group_by_col((key.clone(), KinshipProjects::Slug))
                .group_by_col((key.clone(), KinshipProjects::Label))
                .order_by((key, KinshipProjects::Slug), Order::Asc);
        }
        FacetKey::Schema => {
            match kind {
                CandidateKind::Entity => {
                    let link = Alias::new(FACET_LINK);
                    select
                        .join_as(
                            JoinType::InnerJoin,
                            KinshipEntitySchemas::Table,
                            link.clone(),
                            Expr::col((link.clone(), KinshipEntitySchemas::EntityId))
                                .equals((keyed, KinshipEntities::EntityId)),
                        )
                        .join_as(
                            JoinType::InnerJoin,
                            KinshipSchemas::Table,
                            key.clone(),
                            Expr::col((key.clone(), KinshipSchemas::SchemaId))
                                .equals((link, KinshipEntitySchemas::SchemaId)),
                        );
                }
                CandidateKind::Relation => {
                    select.join_as(
                        JoinType::InnerJoin,
                        KinshipSchemas::Table,
                        key.clone(),
                        Expr::col((key.clone(), KinshipSchemas::SchemaId))
                            .equals((keyed, KinshipRelations::SchemaId)),
                    );
                }
            }
            select
                .expr_as(
                    Expr::col((key.clone(), KinshipSchemas::SchemaId)),
                    Alias::new("facet_schema_id"),
                )
                .expr_as(
                    Expr::col((key.clone(), KinshipSchemas::Name)),
                    Alias::new("facet_name"),
                )
                .expr_as(
                    Expr::col((key.clone(), KinshipSchemas::Label)),
                    Alias::new("facet_label"),
                )
                .group_by_col((key.clone(), KinshipSchemas::SchemaId))
                .group_by_col((key.clone(), KinshipSchemas::Name))
                .group_by_col((key.clone(), KinshipSchemas::Label))
                .order_by((key, KinshipSchemas::Name), Order::Asc);
        }
        FacetKey::Property(name) => {
            let on = Cond::all()
                .add(property_owner(kind, &key).eq(candidate_id(kind, &keyed)))
                .add(Expr::col((key.clone(), PropertyColumn::Active)).eq(true))
                .add(Expr::col((key.clone(), PropertyColumn::Name)).eq(name.as_str()));
            match kind {
                CandidateKind::Entity => select.join_as(
                    JoinType::InnerJoin,
                    KinshipEntityProperties::Table,
                    key.clone(),
                    on,
                ),
                CandidateKind::Relation => select.join_as(
                    JoinType::InnerJoin,
                    KinshipRelationProperties::Table,
                    key.clone(),
                    on,
                ),
            };
            for (column, label) in [
                (PropertyColumn::ValueString, "facet_value_string"),
                (PropertyColumn::ValueInteger, "facet_value_integer"),
                (PropertyColumn::ValueFloat, "facet_value_float"),
                (PropertyColumn::ValueDatetime, "facet_value_datetime"),
                (PropertyColumn::ValueBoolean, "facet_value_boolean"),
            ] {
                select
                    .expr_as(Expr::col((key.clone(), column)), Alias::new(label))
                    .group_by_col((key.clone(), column))
                    .order_by((key.clone(), column), Order::Asc);
            }
        }
    }
    Ok(select)
}
