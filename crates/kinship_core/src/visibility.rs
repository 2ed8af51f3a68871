use crate::{Atom, Caller, Capability, Predicate};

fn grant(caller: &Caller, capability: Capability) -> Predicate {
    match caller.account {
        Some(account) => Predicate::atom(Atom::Grant {
            account,
            capability,
        }),
        None => Predicate::False,
    }
}

/// Entities are readable when published and either public or granted to a reader,
/// or at any status when the caller can edit the project.
pub fn entity_visibility(caller: &Caller) -> Predicate {
    let published = Predicate::atom(Atom::Published);
    Predicate::or([
        Predicate::and([Predicate::atom(Atom::ProjectPublic), published.clone()]),
        Predicate::and([grant(caller, Capability::Reader), published]),
        grant(caller, Capability::Editor),
    ])
}

/// Relations only check project privacy and reader grants; endpoint status is not consulted.
pub fn relation_visibility(caller: &Caller) -> Predicate {
    Predicate::or([
        Predicate::atom(Atom::ProjectPublic),
        grant(caller, Capability::Reader),
    ])
}

#[cfg(test)]
mod tests {
    use super::{entity_visibility, relation_visibility};
    use crate::{AccountId, Atom, Caller, Capability, Predicate};

    #[test]
    fn anonymous_entities_need_public_and_published() {
        assert_eq!(
            entity_visibility(&Caller::anonymous()),
            Predicate::And(vec![
                Predicate::Atom(Atom::ProjectPublic),
                Predicate::Atom(Atom::Published),
            ])
        );
    }

    #[test]
    fn anonymous_relations_need_public_projects() {
        assert_eq!(
            relation_visibility(&Caller::anonymous()),
            Predicate::Atom(Atom::ProjectPublic)
        );
    }

    #[test]
    fn accounts_get_three_entity_branches() {
        let account = AccountId::new();
        let predicate = entity_visibility(&Caller::account(account));
        let Predicate::Or(branches) = predicate else {
            panic!("expected disjunction");
        };
        assert_eq!(branches.len(), 3);
        assert_eq!(
            branches[2],
            Predicate::Atom(Atom::Grant {
                account,
                capability: Capability::Editor
            })
        );
        assert!(matches!(&branches[1], Predicate::And(parts) if parts.contains(&Predicate::Atom(Atom::Published))));
    }

    #[test]
    fn relation_readers_skip_status() {
        let account = AccountId::new();
        let predicate = relation_visibility(&Caller::account(account));
        assert!(!predicate.atoms().contains(&&Atom::Published));
        assert!(predicate.atoms().contains(&&Atom::Grant {
            account,
            capability: Capability::Reader
        }));
    }
}
