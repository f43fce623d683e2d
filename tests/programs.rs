use jackc::{translate, Mode};

const SEVEN: &str = "
/** Computes 1 + (2 * 3) and prints the result. */
class Main {
   function void main() {
      do Output.printInt(1 + (2 * 3));
      return;
   }
}
";

const SQUARE: &str = "
// A graphical square that can be moved and resized.
class Square {

   field int x, y; // screen location of the top-left corner
   field int size;

   constructor Square new(int Ax, int Ay, int Asize) {
      let x = Ax;
      let y = Ay;
      let size = Asize;
      do draw();
      return this;
   }

   method void dispose() {
      do Memory.deAlloc(this);
      return;
   }

   method void draw() {
      do Screen.setColor(true);
      do Screen.drawRectangle(x, y, x + size, y + size);
      return;
   }

   method void incSize() {
      if (((y + size) < 254) & ((x + size) < 510)) {
         do erase();
         let size = size + 2;
         do draw();
      }
      return;
   }

   method void moveUp() {
      if (y > 1) {
         do Screen.setColor(false);
         do Screen.drawRectangle(x, (y + size) - 1, x + size, y + size);
         let y = y - 2;
      }
      return;
   }

   method void erase() {
      do Screen.setColor(false);
      do Screen.drawRectangle(x, y, x + size, y + size);
      return;
   }
}
";

const AVERAGE: &str = "
class Main {
   /* Reads numbers and
      prints their average. */
   function void main() {
      var Array a;
      var int length;
      var int i, sum;

      let length = Keyboard.readInt(\"How many numbers? \");
      let a = Array.new(length);
      let i = 0;

      while (i < length) {
         let a[i] = Keyboard.readInt(\"Enter a number: \");
         let sum = sum + a[i];
         let i = i + 1;
      }

      do Output.printString(\"The average is \");
      do Output.printInt(sum / length);
      return;
   }
}
";

const LIST: &str = "
class List {
   field int data;
   field List next;
   static int created;

   constructor List new(int car, List cdr) {
      let data = car;
      let next = cdr;
      let created = created + 1;
      return this;
   }

   method int sum() {
      var int total;
      var List current;
      let current = this;
      while (~(current = null)) {
         let total = total + current.getData();
         let current = current.getNext();
      }
      return total;
   }

   method int getData() { return data; }
   method List getNext() { return next; }

   function boolean isEmpty(List list) {
      if (list = null) { return true; } else { return false; }
   }

   method void dispose() {
      if (~(next = null)) {
         do next.dispose();
      }
      do Memory.deAlloc(this);
      return;
   }
}
";

fn compile(source: &str) -> Vec<String> {
    let mut output = Vec::new();
    translate(Mode::Compile, source.as_bytes(), &mut output).unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| line.trim().to_owned())
        .collect()
}

fn context(function: &str, number: usize, line: &str, depth: i64) -> String {
    format!("{} at line {} (`{}`), depth {}", function, number + 1, line, depth)
}

/// Checks that every statement leaves the stack as it found it.
///
/// Statements are straight-line code between labels and jumps, so control
/// flow points must see an empty stack and `return` exactly one value.
fn assert_balanced(code: &[String]) {
    let mut depth: i64 = 0;
    let mut function = "";

    for (number, line) in code.iter().enumerate() {
        let words: Vec<&str> = line.split_whitespace().collect();

        match words[..] {
            ["function", name, _] => {
                assert_eq!(depth, 0, "{}", context(function, number, line, depth));
                function = name;
            }

            ["push", _, _] => depth += 1,
            ["pop", _, _] => depth -= 1,
            ["add" | "sub" | "eq" | "gt" | "lt" | "and" | "or"] => depth -= 1,
            ["neg" | "not"] => assert!(depth >= 1, "{}", context(function, number, line, depth)),

            ["call", _, arguments] => {
                let arguments: i64 = arguments.parse().unwrap();
                assert!(depth >= arguments, "{}", context(function, number, line, depth));
                depth += 1 - arguments;
            }

            ["label", _] | ["goto", _] => {
                assert_eq!(depth, 0, "{}", context(function, number, line, depth));
            }

            ["if-goto", _] => {
                depth -= 1;
                assert_eq!(depth, 0, "{}", context(function, number, line, depth));
            }

            ["return"] => {
                assert_eq!(depth, 1, "{}", context(function, number, line, depth));
                depth = 0;
            }

            _ => panic!("unknown instruction `{}`", line),
        }

        assert!(depth >= 0, "{}", context(function, number, line, depth));
    }

    assert_eq!(depth, 0);
}

#[test]
fn seven_matches_reference_output() {
    assert_eq!(
        compile(SEVEN),
        [
            "function Main.main 0",
            "push constant 1",
            "push constant 2",
            "push constant 3",
            "call Math.multiply 2",
            "add",
            "call Output.printInt 1",
            "pop temp 0",
            "push constant 0",
            "return",
        ]
    );
}

#[test]
fn whole_programs_keep_the_stack_balanced() {
    for source in [SEVEN, SQUARE, AVERAGE, LIST] {
        assert_balanced(&compile(source));
    }
}

#[test]
fn square_resolves_fields_and_methods() {
    let code = compile(SQUARE);

    let functions: Vec<_> = code
        .iter()
        .filter(|line| line.starts_with("function"))
        .map(String::as_str)
        .collect();

    assert_eq!(
        functions,
        [
            "function Square.new 0",
            "function Square.dispose 0",
            "function Square.draw 0",
            "function Square.incSize 0",
            "function Square.moveUp 0",
            "function Square.erase 0",
        ]
    );

    assert_eq!(code[1..4], ["push constant 3", "call Memory.alloc 1", "pop pointer 0"]);
    assert!(code.contains(&"call Screen.drawRectangle 4".to_owned()));
    assert!(code.contains(&"call Square.erase 1".to_owned()));
    assert!(code.contains(&"pop this 2".to_owned()));
}

#[test]
fn average_uses_arrays_and_strings() {
    let code = compile(AVERAGE);

    assert_eq!(code[0], "function Main.main 4");
    assert!(code.contains(&"call Array.new 1".to_owned()));
    assert!(code.contains(&"call Math.divide 2".to_owned()));

    // "How many numbers? " is 18 characters long
    let start = code
        .iter()
        .position(|line| line == "push constant 18")
        .unwrap();
    assert_eq!(code[start + 1], "call String.new 1");
    assert_eq!(code[start + 2], "push constant 72");
    assert_eq!(code[start + 3], "call String.appendChar 2");
}

#[test]
fn calls_through_object_variables_use_declared_type() {
    let code = compile(LIST);

    assert!(code.contains(&"call List.getData 1".to_owned()));
    assert!(code.contains(&"call List.dispose 1".to_owned()));
    assert!(code.contains(&"call Memory.deAlloc 1".to_owned()));

    let is_empty = code
        .iter()
        .position(|line| line == "function List.isEmpty 0")
        .unwrap();
    assert_eq!(code[is_empty + 1], "push argument 0");
}

#[test]
fn parse_tree_wraps_every_statement() {
    let mut output = Vec::new();
    translate(Mode::Parse, SQUARE.as_bytes(), &mut output).unwrap();
    let tree = String::from_utf8(output).unwrap();

    let count = |tag: &str| tree.matches(tag).count();
    assert_eq!(count("<subroutineDec>"), 6);
    assert_eq!(count("<subroutineDec>"), count("</subroutineDec>"));
    assert_eq!(count("<ifStatement>"), 2);
    assert_eq!(count("<term>"), count("</term>"));
    assert!(tree.contains("<symbol> &lt; </symbol>"));
    assert!(!tree.contains("screen location"));
}
