//! The prototype walkthrough, written directly against the runtime object
//! model. `demos/prototypes.proto` tells the same story as a walk script.

use crate::runtime::{Console, Constructor, Function, Record, RuntimeResult, Value};

pub fn run(console: &Console) -> RuntimeResult<()> {
    let person = Constructor::new("Person", ["name", "age"]);
    let person_1 = person.construct(&[Value::from("Yoshi"), Value::from(23.0)])?;
    let person_2 = person.construct(&[Value::from("Ninja"), Value::from(23.0)])?;

    console.log(introduce(1, &person_1));
    console.log(introduce(2, &person_2));

    // Per-instance additions: visible on one record only.
    let eggs = console.clone();
    person_1.set(
        "lay_eggs",
        Function::native(None, move |_, _| {
            eggs.log("Lay giant eggs. Hooray!");
            Ok(Value::Undefined)
        }),
    );
    person_2.set("nationality", "Japanese");
    let clones = console.clone();
    person_2.set(
        "shadow_cloning",
        Function::native(None, move |_, _| {
            clones.log("Too many to count?");
            Ok(Value::Undefined)
        }),
    );

    console.log("\n\n*** Before adding prototypes ****");
    console.log(person_1.to_string());
    console.log(person_2.to_string());

    // Shared additions: every instance reaches these through its delegate.
    let prototype = person.prototype();
    prototype.set("movement_means", Value::Null);
    prototype.set("movement", Function::native(None, movement));
    person_1.set("movement_means", "making giant steps");
    person_2.set("movement_means", "flying on a sword");

    console.log("\n\n*** After adding prototypes ****");
    console.log(person_1.to_string());
    console.log(person_2.to_string());

    console.log(lookup(&person_1, "name").to_string());
    console.log(person_1.invoke("movement", &[])?.to_string());

    console.log("\n\n****Inheriting methods and properties ****");
    console.log(person_1.invoke("movement", &[])?.to_string());

    let person_1_child = Record::with_delegate(&person_1);
    person_1_child.set("name", "Baby Yoshi");
    person_1_child.set("age", 1.0);
    person_1_child.set("movement_means", "making tiny steps");
    console.log(person_1_child.to_string());

    console.log(lookup(&person_1_child, "name").to_string());
    console.log(lookup(&person_1_child, "age").to_string());
    console.log(person_1_child.invoke("movement", &[])?.to_string());

    Ok(())
}

fn movement(this: &Record, _args: &[Value]) -> RuntimeResult<Value> {
    let means = lookup(this, "movement_means");
    Ok(Value::String(format!("Moves by {means}")))
}

fn introduce(index: usize, person: &Record) -> String {
    format!(
        "person {index} name: {} age: {}",
        lookup(person, "name"),
        lookup(person, "age")
    )
}

fn lookup(record: &Record, key: &str) -> Value {
    record.resolve(key).unwrap_or(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walkthrough_lines() {
        let console = Console::capture();
        run(&console).expect("walkthrough");
        assert_eq!(
            console.lines(),
            vec![
                "person 1 name: Yoshi age: 23",
                "person 2 name: Ninja age: 23",
                "\n\n*** Before adding prototypes ****",
                "Person { name: 'Yoshi', age: 23, lay_eggs: [Function (anonymous)] }",
                "Person {\n  name: 'Ninja',\n  age: 23,\n  nationality: 'Japanese',\n  shadow_cloning: [Function (anonymous)]\n}",
                "\n\n*** After adding prototypes ****",
                "Person {\n  name: 'Yoshi',\n  age: 23,\n  lay_eggs: [Function (anonymous)],\n  movement_means: 'making giant steps'\n}",
                "Person {\n  name: 'Ninja',\n  age: 23,\n  nationality: 'Japanese',\n  shadow_cloning: [Function (anonymous)],\n  movement_means: 'flying on a sword'\n}",
                "Yoshi",
                "Moves by making giant steps",
                "\n\n****Inheriting methods and properties ****",
                "Moves by making giant steps",
                "Person {\n  name: 'Baby Yoshi',\n  age: 1,\n  movement_means: 'making tiny steps'\n}",
                "Baby Yoshi",
                "1",
                "Moves by making tiny steps",
            ]
        );
    }
}
